#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use profile_sync::contract::model::{Course, CourseRef, Instructor, Profile, Role};
use profile_sync::domain::policy::RetryPolicy;
use profile_sync::domain::service::{Service, ServiceConfig};
use profile_sync::infra::memory::{MemoryIdentityProvider, MemoryStore};

pub fn course(id: &str, title: &str) -> Course {
    Course {
        id: CourseRef::new(id),
        title: title.to_string(),
        description: None,
        slug: Some(id.to_string()),
        image_ref: None,
        instructor_refs: vec![],
    }
}

/// Catalog order: c1, c2, c42.
pub fn seeded_store(visibility_delay: Duration) -> Arc<MemoryStore> {
    let store = MemoryStore::new(visibility_delay);
    store.add_course(course("c1", "Rust for Beginners"));
    store.add_course(course("c2", "Async in Practice"));
    store.add_course(course("c42", "Answering Everything"));
    Arc::new(store)
}

pub fn fast_config() -> ServiceConfig {
    ServiceConfig {
        retry: RetryPolicy::immediate(3),
        ..Default::default()
    }
}

pub fn service_with(store: Arc<MemoryStore>, config: ServiceConfig) -> Arc<Service> {
    Arc::new(Service::new(
        store.clone(),
        store,
        Arc::new(MemoryIdentityProvider::new()),
        config,
    ))
}

pub fn service(store: Arc<MemoryStore>) -> Arc<Service> {
    service_with(store, fast_config())
}

pub fn stored_profile(identity: &str, refs: &[&str], updated_at: DateTime<Utc>) -> Profile {
    Profile {
        record_id: format!("rec-{identity}"),
        identity_ref: identity.to_string(),
        name: identity.to_string(),
        email: format!("{identity}@example.com"),
        role: Role::Student,
        bio: None,
        avatar_ref: None,
        enrolled_course_refs: refs.iter().map(|r| CourseRef::new(*r)).collect(),
        updated_at,
    }
}

pub fn instructor(record_id: &str, identity: &str) -> Instructor {
    Instructor {
        record_id: record_id.to_string(),
        identity_ref: identity.to_string(),
        name: "Grace".to_string(),
    }
}

pub fn ids(courses: &[Course]) -> Vec<&str> {
    courses.iter().map(|c| c.id.as_str()).collect()
}
