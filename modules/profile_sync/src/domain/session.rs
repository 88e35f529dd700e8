use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::contract::error::ProfileSyncError;
use crate::contract::model::{Profile, SessionView, SignUpRequest};
use crate::domain::binder::{BinderState, SessionBinder};
use crate::domain::error::DomainError;
use crate::domain::ports::IdentitySessionSource;
use crate::domain::service::Service;

/// One user's session: the identity session source plus the binder it
/// drives. Consumers hold this value; there is no process-wide session.
pub struct UserSession {
    service: Arc<Service>,
    source: Arc<dyn IdentitySessionSource>,
    binder: Arc<SessionBinder>,
    driver: JoinHandle<()>,
}

impl UserSession {
    pub fn new(service: Arc<Service>, source: Arc<dyn IdentitySessionSource>) -> Self {
        let binder = SessionBinder::new(service.reconciler());
        let driver = binder.drive(source.subscribe());
        Self {
            service,
            source,
            binder,
            driver,
        }
    }

    pub fn binder(&self) -> &Arc<SessionBinder> {
        &self.binder
    }

    pub fn view(&self) -> SessionView {
        self.binder.view()
    }

    #[instrument(name = "profile_sync.session.sign_up", skip_all)]
    pub async fn sign_up(&self, req: &SignUpRequest) -> Result<Profile, ProfileSyncError> {
        let (identity, profile) = self.service.sign_up(req).await?;
        self.binder.bind(identity.clone(), profile.clone());
        self.source.establish(identity);
        Ok(profile)
    }

    /// The profile is expected to exist; it is fetched on the retry path.
    #[instrument(name = "profile_sync.session.sign_in", skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, ProfileSyncError> {
        let identity = self.service.authenticate(email, password).await?;
        self.source.establish(identity.clone());
        self.binder.handle(Some(identity)).await;

        match self.binder.wait_settled().await {
            BinderState::Ready { profile, .. } => Ok(profile),
            BinderState::Error { error, .. } => Err(error),
            // signed out while reconciling
            BinderState::Unauthenticated | BinderState::AuthenticatingProfile { .. } => {
                Err(ProfileSyncError::Unauthorized)
            }
        }
    }

    #[instrument(name = "profile_sync.session.sign_out", skip_all)]
    pub async fn sign_out(&self) -> Result<(), ProfileSyncError> {
        self.source
            .sign_out()
            .await
            .map_err(|e| DomainError::identity_unavailable(e.to_string()))?;
        self.binder.handle(None).await;
        info!("signed out");
        Ok(())
    }
}

impl Drop for UserSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
