use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{CourseListing, CourseRef, EnrollOutcome, Profile};
use crate::domain::error::DomainError;
use crate::domain::locks::KeyedLocks;
use crate::domain::policy::RetryPolicy;
use crate::domain::repo::{CoursesRepository, ProfilePatch, ProfilesRepository};

pub struct EnrollmentMutator {
    profiles: Arc<dyn ProfilesRepository>,
    courses: Arc<dyn CoursesRepository>,
    policy: RetryPolicy,
    reject_duplicates: bool,
    records: KeyedLocks,
}

impl EnrollmentMutator {
    pub fn new(
        profiles: Arc<dyn ProfilesRepository>,
        courses: Arc<dyn CoursesRepository>,
        policy: RetryPolicy,
        reject_duplicates: bool,
    ) -> Self {
        Self {
            profiles,
            courses,
            policy,
            reject_duplicates,
            records: KeyedLocks::new(),
        }
    }

    /// Append `course` to the profile's enrollment list unless it is
    /// already there. Returns the profile as it stands afterwards.
    #[instrument(
        name = "profile_sync.enrollment.enroll",
        skip(self),
        fields(record_id = %record_id, course = %course)
    )]
    pub async fn enroll(
        &self,
        record_id: &str,
        course: CourseRef,
    ) -> Result<(Profile, EnrollOutcome), DomainError> {
        let _guard = self.records.lock(record_id).await;

        let profile = self.find_with_retry(record_id).await?;

        let known = self
            .courses
            .find_by_id(&course)
            .await
            .map_err(DomainError::from_store)?;
        if known.is_none() {
            return Err(DomainError::course_not_found(course));
        }

        if profile.is_enrolled_in(&course) {
            if self.reject_duplicates {
                return Err(DomainError::duplicate_enrollment(course));
            }
            debug!("already enrolled");
            return Ok((profile, EnrollOutcome::AlreadyEnrolled));
        }

        let patched = self
            .profiles
            .patch(record_id, ProfilePatch::append_course(course))
            .await
            .map_err(DomainError::from_store)?
            .ok_or_else(|| DomainError::profile_record_not_found(record_id))?;

        info!("enrolled");
        Ok((patched, EnrollOutcome::Enrolled))
    }

    // a freshly created record may still be replicating
    async fn find_with_retry(&self, record_id: &str) -> Result<Profile, DomainError> {
        let attempts = self.policy.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.profiles.find_by_id(record_id).await {
                Ok(Some(profile)) => return Ok(profile),
                Ok(None) => {
                    debug!(attempt, attempts, "profile record not visible yet");
                    last_error = None;
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "profile record fetch failed");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        match last_error {
            Some(e) => Err(DomainError::from_store(e)),
            None => Err(DomainError::profile_record_not_found(record_id)),
        }
    }

    /// Partition the catalog into the profile's courses and the rest.
    #[instrument(
        name = "profile_sync.enrollment.list_courses",
        skip(self, profile),
        fields(record_id = %profile.record_id)
    )]
    pub async fn list_courses(&self, profile: &Profile) -> Result<CourseListing, DomainError> {
        let mut seen = HashSet::new();
        let refs: Vec<CourseRef> = profile
            .enrolled_course_refs
            .iter()
            .filter(|r| seen.insert((*r).clone()))
            .cloned()
            .collect();

        let enrolled = self
            .courses
            .find_many(&refs)
            .await
            .map_err(DomainError::from_store)?;
        if enrolled.len() < refs.len() {
            debug!(
                dangling = refs.len() - enrolled.len(),
                "skipping enrollment references without a course"
            );
        }

        let catalog = self
            .courses
            .list_all()
            .await
            .map_err(DomainError::from_store)?;
        let available = catalog
            .into_iter()
            .filter(|c| !seen.contains(&c.id))
            .collect();

        Ok(CourseListing { enrolled, available })
    }

    pub fn has_access(profile: &Profile, course: &CourseRef) -> bool {
        profile.is_enrolled_in(course)
    }
}
