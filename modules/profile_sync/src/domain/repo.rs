use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::model::{Course, CourseRef, Instructor, NewProfile, Profile, Role};

/// Field changes committed to one profile record as a single mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// `setIfMissing(enrolled_course_refs = [])`, applied before any append.
    pub init_enrollments: bool,
    /// `append(enrolled_course_refs, [..])`.
    pub append_enrollments: Vec<CourseRef>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && !self.init_enrollments
            && self.append_enrollments.is_empty()
    }

    /// The enrollment mutation: initialize the list, then append.
    pub fn append_course(course: CourseRef) -> Self {
        Self {
            init_enrollments: true,
            append_enrollments: vec![course],
            ..Default::default()
        }
    }
}

/// Port for the domain layer: profile documents in the content store.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait ProfilesRepository: Send + Sync {
    /// Fetch the profile whose `identity_ref` equals the identity.
    async fn find_by_identity(&self, identity_ref: &str) -> anyhow::Result<Option<Profile>>;
    /// Fetch by store-assigned record id.
    async fn find_by_id(&self, record_id: &str) -> anyhow::Result<Option<Profile>>;
    /// Create a profile with an empty enrollment list.
    ///
    /// Must be idempotent per `identity_ref`: if a record for the identity
    /// already exists it is returned unchanged.
    async fn create(&self, new_profile: NewProfile) -> anyhow::Result<Profile>;
    /// Apply `patch` and return the updated record; `None` if it does not exist.
    async fn patch(&self, record_id: &str, patch: ProfilePatch) -> anyhow::Result<Option<Profile>>;
    /// Profiles referencing `course`, optionally only those updated after `since`.
    async fn count_enrolled(
        &self,
        course: &CourseRef,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64>;
}

/// Port for the domain layer: read-only course catalog and instructors.
#[async_trait]
pub trait CoursesRepository: Send + Sync {
    /// Whole catalog in store order.
    async fn list_all(&self) -> anyhow::Result<Vec<Course>>;
    async fn find_by_id(&self, id: &CourseRef) -> anyhow::Result<Option<Course>>;
    /// Resolve references in the order given; unresolvable ones are skipped.
    async fn find_many(&self, ids: &[CourseRef]) -> anyhow::Result<Vec<Course>>;
    async fn find_instructor(&self, identity_ref: &str) -> anyhow::Result<Option<Instructor>>;
    async fn list_by_instructor(&self, instructor_record_id: &str) -> anyhow::Result<Vec<Course>>;
}
