use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::{
    error::ProfileSyncError,
    model::{Course, CourseListing, CourseRef, CourseStats, EnrollOutcome, Profile, ProfileHints},
};

/// Public API trait for the profile_sync module that other modules can use
#[async_trait]
pub trait ProfileSyncApi: Send + Sync {
    /// Ensure a profile exists for the identity and return it.
    async fn reconcile(
        &self,
        identity: &str,
        hints: Option<ProfileHints>,
    ) -> Result<Profile, ProfileSyncError>;

    /// Reconcile, then refresh name/email (and role when hinted) on an existing profile.
    async fn sync_profile(
        &self,
        identity: &str,
        hints: ProfileHints,
    ) -> Result<Profile, ProfileSyncError>;

    /// Add a course to a profile's enrollment list; returns the updated profile.
    async fn enroll(
        &self,
        profile_record_id: &str,
        course: CourseRef,
    ) -> Result<(Profile, EnrollOutcome), ProfileSyncError>;

    /// Enrolled/available partition of the catalog.
    async fn list_courses(&self, identity: &str) -> Result<CourseListing, ProfileSyncError>;

    /// Whether the identity may open the course.
    async fn has_access(&self, identity: &str, course: &CourseRef)
        -> Result<bool, ProfileSyncError>;

    /// Course statistics for the instructor bound to the identity.
    async fn teaching_overview(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CourseStats>, ProfileSyncError>;

    /// Full course catalog.
    async fn catalog(&self) -> Result<Vec<Course>, ProfileSyncError>;
}
