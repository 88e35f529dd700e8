use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{NewProfile, Profile, ProfileHints, Role};
use crate::domain::error::DomainError;
use crate::domain::locks::KeyedLocks;
use crate::domain::policy::RetryPolicy;
use crate::domain::repo::{ProfilePatch, ProfilesRepository};

/// Guarantees that an authenticated identity has exactly one profile.
pub struct Reconciler {
    profiles: Arc<dyn ProfilesRepository>,
    policy: RetryPolicy,
    default_role: Role,
    creating: KeyedLocks,
}

impl Reconciler {
    pub fn new(profiles: Arc<dyn ProfilesRepository>, policy: RetryPolicy, default_role: Role) -> Self {
        Self {
            profiles,
            policy,
            default_role,
            creating: KeyedLocks::new(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// With hints the profile is created when missing. Without hints it is
    /// expected to exist already and the fetch is retried per [`RetryPolicy`].
    #[instrument(
        name = "profile_sync.reconciler.reconcile",
        skip(self, hints),
        fields(identity = %identity, hinted = hints.is_some())
    )]
    pub async fn reconcile(
        &self,
        identity: &str,
        hints: Option<&ProfileHints>,
    ) -> Result<Profile, DomainError> {
        match hints {
            Some(hints) => self.fetch_or_create(identity, hints).await.map(|(p, _)| p),
            None => self.fetch_with_retry(identity).await,
        }
    }

    /// Reconcile, then bring an already existing profile in line with the hints.
    /// The role is only touched when the hints carry one.
    #[instrument(name = "profile_sync.reconciler.sync", skip(self, hints), fields(identity = %identity))]
    pub async fn sync(&self, identity: &str, hints: &ProfileHints) -> Result<Profile, DomainError> {
        let (profile, created) = self.fetch_or_create(identity, hints).await?;
        if created {
            return Ok(profile);
        }

        let mut patch = ProfilePatch::default();
        if let Some(name) = non_blank(hints.name.as_deref()) {
            if name != profile.name {
                patch.name = Some(name.to_string());
            }
        }
        if let Some(email) = non_blank(hints.email.as_deref()) {
            if email != profile.email {
                patch.email = Some(email.to_string());
            }
        }
        if let Some(role) = hints.default_role {
            if role != profile.role {
                patch.role = Some(role);
            }
        }
        if patch.is_empty() {
            debug!("profile already up to date");
            return Ok(profile);
        }

        info!(record_id = %profile.record_id, "updating profile from identity");
        self.profiles
            .patch(&profile.record_id, patch)
            .await
            .map_err(DomainError::from_store)?
            .ok_or_else(|| DomainError::profile_record_not_found(&profile.record_id))
    }

    /// Read along the retry path, for callers that may run right after sign-up.
    pub async fn find_settled(&self, identity: &str) -> Result<Profile, DomainError> {
        self.fetch_with_retry(identity).await
    }

    async fn fetch_or_create(
        &self,
        identity: &str,
        hints: &ProfileHints,
    ) -> Result<(Profile, bool), DomainError> {
        // check-then-create must not interleave for one identity
        let _guard = self.creating.lock(identity).await;

        let existing = self
            .profiles
            .find_by_identity(identity)
            .await
            .map_err(DomainError::from_store)?;
        if let Some(profile) = existing {
            debug!(record_id = %profile.record_id, "profile exists");
            return Ok((profile, false));
        }

        if non_blank(hints.email.as_deref()).is_none() {
            return Err(DomainError::validation("email", "is required to create a profile"));
        }
        let new_profile = self.new_profile(identity, hints);
        info!(role = %new_profile.role, "creating profile");
        let profile = self
            .profiles
            .create(new_profile)
            .await
            .map_err(DomainError::from_store)?;
        Ok((profile, true))
    }

    async fn fetch_with_retry(&self, identity: &str) -> Result<Profile, DomainError> {
        let attempts = self.policy.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.profiles.find_by_identity(identity).await {
                Ok(Some(profile)) => {
                    if attempt > 1 {
                        info!(attempt, "profile became visible");
                    }
                    return Ok(profile);
                }
                Ok(None) => {
                    debug!(attempt, attempts, "profile not visible yet");
                    last_error = None;
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "profile fetch failed");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        match last_error {
            Some(e) => Err(DomainError::from_store(e)),
            None => {
                warn!(attempts, "profile not found after retries");
                Err(DomainError::profile_not_found(identity))
            }
        }
    }

    fn new_profile(&self, identity: &str, hints: &ProfileHints) -> NewProfile {
        let email = non_blank(hints.email.as_deref()).unwrap_or_default().to_string();
        let name = match non_blank(hints.name.as_deref()) {
            Some(name) => name.to_string(),
            None => email.split('@').next().unwrap_or_default().to_string(),
        };
        NewProfile {
            identity_ref: identity.to_string(),
            name,
            email,
            role: hints.default_role.unwrap_or(self.default_role),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
