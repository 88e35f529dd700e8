use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::contract::model::{
    Course, CourseListing, CourseRef, CourseStats, EnrollOutcome, Identity, Profile, ProfileHints,
    Role, SignUpRequest,
};
use crate::domain::auth::{map_identity_error, validate_email, validate_sign_up};
use crate::domain::enrollment::EnrollmentMutator;
use crate::domain::error::DomainError;
use crate::domain::policy::RetryPolicy;
use crate::domain::ports::{IdentityProvider, IdentitySessionSource};
use crate::domain::reconciler::Reconciler;
use crate::domain::repo::{CoursesRepository, ProfilesRepository};
use crate::domain::session::UserSession;
use crate::domain::teaching::TeachingOverview;

/// Runtime knobs of the domain service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_role: Role,
    pub retry: RetryPolicy,
    pub reject_duplicate_enrollment: bool,
    pub new_student_window: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_role: Role::Student,
            retry: RetryPolicy::default(),
            reject_duplicate_enrollment: false,
            new_student_window: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Domain service: the reconciler, the enrollment mutator and the auth
/// flows behind one facade.
pub struct Service {
    reconciler: Arc<Reconciler>,
    enrollment: EnrollmentMutator,
    teaching: TeachingOverview,
    courses: Arc<dyn CoursesRepository>,
    identity: Arc<dyn IdentityProvider>,
    config: ServiceConfig,
}

impl Service {
    pub fn new(
        profiles: Arc<dyn ProfilesRepository>,
        courses: Arc<dyn CoursesRepository>,
        identity: Arc<dyn IdentityProvider>,
        config: ServiceConfig,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            profiles.clone(),
            config.retry,
            config.default_role,
        ));
        let enrollment = EnrollmentMutator::new(
            profiles.clone(),
            courses.clone(),
            config.retry,
            config.reject_duplicate_enrollment,
        );
        let teaching = TeachingOverview::new(profiles, courses.clone(), config.new_student_window);
        Self {
            reconciler,
            enrollment,
            teaching,
            courses,
            identity,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::clone(&self.reconciler)
    }

    pub async fn reconcile(
        &self,
        identity: &str,
        hints: Option<ProfileHints>,
    ) -> Result<Profile, DomainError> {
        self.reconciler.reconcile(identity, hints.as_ref()).await
    }

    pub async fn sync_profile(
        &self,
        identity: &str,
        hints: ProfileHints,
    ) -> Result<Profile, DomainError> {
        self.reconciler.sync(identity, &hints).await
    }

    pub async fn enroll(
        &self,
        record_id: &str,
        course: CourseRef,
    ) -> Result<(Profile, EnrollOutcome), DomainError> {
        self.enrollment.enroll(record_id, course).await
    }

    /// Resolve the identity's profile, then enroll it.
    #[instrument(name = "profile_sync.service.enroll_identity", skip(self), fields(identity = %identity, course = %course))]
    pub async fn enroll_identity(
        &self,
        identity: &str,
        course: CourseRef,
    ) -> Result<(Profile, EnrollOutcome), DomainError> {
        let profile = self.reconciler.find_settled(identity).await?;
        self.enrollment.enroll(&profile.record_id, course).await
    }

    pub async fn list_courses(&self, identity: &str) -> Result<CourseListing, DomainError> {
        let profile = self.reconciler.find_settled(identity).await?;
        self.enrollment.list_courses(&profile).await
    }

    #[instrument(name = "profile_sync.service.has_access", skip(self), fields(identity = %identity, course = %course))]
    pub async fn has_access(&self, identity: &str, course: &CourseRef) -> Result<bool, DomainError> {
        let profile = self.reconciler.find_settled(identity).await?;
        let allowed = EnrollmentMutator::has_access(&profile, course);
        debug!(allowed, "course access checked");
        Ok(allowed)
    }

    pub async fn teaching_overview(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CourseStats>, DomainError> {
        self.teaching.overview(identity, now).await
    }

    #[instrument(name = "profile_sync.service.catalog", skip(self))]
    pub async fn catalog(&self) -> Result<Vec<Course>, DomainError> {
        self.courses
            .list_all()
            .await
            .map_err(DomainError::from_store)
    }

    /// Create the account, then its profile with the configured default role.
    #[instrument(name = "profile_sync.service.sign_up", skip(self, req), fields(email = %req.email))]
    pub async fn sign_up(&self, req: &SignUpRequest) -> Result<(Identity, Profile), DomainError> {
        validate_sign_up(req)?;

        let name = req.name.trim();
        let identity = self
            .identity
            .sign_up(&req.email, &req.password, Some(name))
            .await
            .map_err(|e| map_identity_error(e, &req.email))?;
        info!(identity = %identity.identifier, "account created");

        let hints = ProfileHints {
            email: identity.email.clone().or_else(|| Some(req.email.clone())),
            name: Some(name.to_string()),
            default_role: Some(self.config.default_role),
        };
        let profile = self
            .reconciler
            .reconcile(&identity.identifier, Some(&hints))
            .await?;
        Ok((identity, profile))
    }

    /// Credential check only; the profile is reconciled by the caller.
    #[instrument(name = "profile_sync.service.authenticate", skip(self, password), fields(email = %email))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, DomainError> {
        validate_email(email)?;
        let identity = self
            .identity
            .sign_in(email, password)
            .await
            .map_err(|e| map_identity_error(e, email))?;
        debug!(identity = %identity.identifier, "credentials accepted");
        Ok(identity)
    }

    /// Sign in and reconcile along the retry path.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(Identity, Profile), DomainError> {
        let identity = self.authenticate(email, password).await?;
        let profile = self.reconciler.reconcile(&identity.identifier, None).await?;
        Ok((identity, profile))
    }

    /// Start a user session bound to `source`.
    pub fn open_session(self: &Arc<Self>, source: Arc<dyn IdentitySessionSource>) -> UserSession {
        UserSession::new(Arc::clone(self), source)
    }
}
