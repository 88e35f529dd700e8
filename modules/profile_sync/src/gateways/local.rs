use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::contract::{
    client::ProfileSyncApi,
    error::ProfileSyncError,
    model::{Course, CourseListing, CourseRef, CourseStats, EnrollOutcome, Profile, ProfileHints},
};
use crate::domain::service::Service;

/// Local implementation of the ProfileSyncApi trait that delegates to the domain service
pub struct ProfileSyncLocalClient {
    service: Arc<Service>,
}

impl ProfileSyncLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ProfileSyncApi for ProfileSyncLocalClient {
    async fn reconcile(
        &self,
        identity: &str,
        hints: Option<ProfileHints>,
    ) -> Result<Profile, ProfileSyncError> {
        Ok(self.service.reconcile(identity, hints).await?)
    }

    async fn sync_profile(
        &self,
        identity: &str,
        hints: ProfileHints,
    ) -> Result<Profile, ProfileSyncError> {
        Ok(self.service.sync_profile(identity, hints).await?)
    }

    async fn enroll(
        &self,
        record_id: &str,
        course: CourseRef,
    ) -> Result<(Profile, EnrollOutcome), ProfileSyncError> {
        Ok(self.service.enroll(record_id, course).await?)
    }

    async fn list_courses(&self, identity: &str) -> Result<CourseListing, ProfileSyncError> {
        Ok(self.service.list_courses(identity).await?)
    }

    async fn has_access(&self, identity: &str, course: &CourseRef) -> Result<bool, ProfileSyncError> {
        Ok(self.service.has_access(identity, course).await?)
    }

    async fn teaching_overview(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CourseStats>, ProfileSyncError> {
        Ok(self.service.teaching_overview(identity, now).await?)
    }

    async fn catalog(&self) -> Result<Vec<Course>, ProfileSyncError> {
        Ok(self.service.catalog().await?)
    }
}
