use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::contract::model::{Course, CourseRef, Instructor, NewProfile, Profile};
use crate::domain::repo::{CoursesRepository, ProfilePatch, ProfilesRepository};

use super::seed::CatalogSeed;

struct StoredProfile {
    profile: Profile,
    visible_at: Instant,
}

impl StoredProfile {
    fn visible(&self) -> Option<&Profile> {
        (Instant::now() >= self.visible_at).then_some(&self.profile)
    }
}

/// Content store kept in process memory.
///
/// Newly created profiles stay invisible to reads for `visibility_delay`,
/// which reproduces the replication lag of the hosted store. `identity_ref`
/// is a unique index, so create is idempotent per identity.
pub struct MemoryStore {
    profiles: DashMap<String, StoredProfile>,
    by_identity: DashMap<String, String>,
    courses: RwLock<Vec<Course>>,
    instructors: RwLock<Vec<Instructor>>,
    visibility_delay: Duration,
}

impl MemoryStore {
    pub fn new(visibility_delay: Duration) -> Self {
        Self {
            profiles: DashMap::new(),
            by_identity: DashMap::new(),
            courses: RwLock::new(Vec::new()),
            instructors: RwLock::new(Vec::new()),
            visibility_delay,
        }
    }

    pub fn with_seed(self, seed: CatalogSeed) -> Self {
        let (courses, instructors) = seed.into_parts();
        *self.courses.write() = courses;
        *self.instructors.write() = instructors;
        self
    }

    pub fn add_course(&self, course: Course) {
        self.courses.write().push(course);
    }

    pub fn add_instructor(&self, instructor: Instructor) {
        self.instructors.write().push(instructor);
    }

    /// Store a complete profile document as-is, visible immediately.
    pub fn put_profile(&self, profile: Profile) {
        self.by_identity
            .insert(profile.identity_ref.clone(), profile.record_id.clone());
        self.profiles.insert(
            profile.record_id.clone(),
            StoredProfile {
                profile,
                visible_at: Instant::now(),
            },
        );
    }

    /// Number of profile documents regardless of visibility.
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl ProfilesRepository for MemoryStore {
    async fn find_by_identity(&self, identity_ref: &str) -> anyhow::Result<Option<Profile>> {
        let Some(record_id) = self.by_identity.get(identity_ref).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        ProfilesRepository::find_by_id(self, &record_id).await
    }

    async fn find_by_id(&self, record_id: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self
            .profiles
            .get(record_id)
            .and_then(|stored| stored.visible().cloned()))
    }

    async fn create(&self, new_profile: NewProfile) -> anyhow::Result<Profile> {
        match self.by_identity.entry(new_profile.identity_ref.clone()) {
            Entry::Occupied(existing) => {
                let profile = self
                    .profiles
                    .get(existing.get())
                    .map(|stored| stored.profile.clone())
                    .ok_or_else(|| anyhow::anyhow!("dangling identity index for {}", existing.key()))?;
                Ok(profile)
            }
            Entry::Vacant(slot) => {
                let profile = Profile {
                    record_id: Uuid::new_v4().to_string(),
                    identity_ref: new_profile.identity_ref,
                    name: new_profile.name,
                    email: new_profile.email,
                    role: new_profile.role,
                    bio: None,
                    avatar_ref: None,
                    enrolled_course_refs: Vec::new(),
                    updated_at: Utc::now(),
                };
                self.profiles.insert(
                    profile.record_id.clone(),
                    StoredProfile {
                        profile: profile.clone(),
                        visible_at: Instant::now() + self.visibility_delay,
                    },
                );
                slot.insert(profile.record_id.clone());
                Ok(profile)
            }
        }
    }

    async fn patch(&self, record_id: &str, patch: ProfilePatch) -> anyhow::Result<Option<Profile>> {
        let Some(mut stored) = self.profiles.get_mut(record_id) else {
            return Ok(None);
        };
        let profile = &mut stored.profile;
        if let Some(name) = patch.name {
            profile.name = name;
        }
        if let Some(email) = patch.email {
            profile.email = email;
        }
        if let Some(role) = patch.role {
            profile.role = role;
        }
        // the list always exists here, so set-if-missing is a no-op
        profile.enrolled_course_refs.extend(patch.append_enrollments);
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    async fn count_enrolled(
        &self,
        course: &CourseRef,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64> {
        let count = self
            .profiles
            .iter()
            .filter_map(|stored| stored.visible().cloned())
            .filter(|p| p.is_enrolled_in(course))
            .filter(|p| since.map_or(true, |since| p.updated_at > since))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl CoursesRepository for MemoryStore {
    async fn list_all(&self) -> anyhow::Result<Vec<Course>> {
        Ok(self.courses.read().clone())
    }

    async fn find_by_id(&self, id: &CourseRef) -> anyhow::Result<Option<Course>> {
        Ok(self.courses.read().iter().find(|c| &c.id == id).cloned())
    }

    async fn find_many(&self, ids: &[CourseRef]) -> anyhow::Result<Vec<Course>> {
        let courses = self.courses.read();
        Ok(ids
            .iter()
            .filter_map(|id| courses.iter().find(|c| &c.id == id).cloned())
            .collect())
    }

    async fn find_instructor(&self, identity_ref: &str) -> anyhow::Result<Option<Instructor>> {
        Ok(self
            .instructors
            .read()
            .iter()
            .find(|i| i.identity_ref == identity_ref)
            .cloned())
    }

    async fn list_by_instructor(&self, instructor_record_id: &str) -> anyhow::Result<Vec<Course>> {
        Ok(self
            .courses
            .read()
            .iter()
            .filter(|c| c.instructor_refs.iter().any(|r| r == instructor_record_id))
            .cloned()
            .collect())
    }
}
