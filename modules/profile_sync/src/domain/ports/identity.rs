use async_trait::async_trait;
use tokio::sync::watch;

use crate::contract::model::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Credential operations of the external identity provider. Stateless:
/// establishing a session is the job of [`IdentitySessionSource`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
}

/// Authentication state of one user session.
#[async_trait]
pub trait IdentitySessionSource: Send + Sync {
    /// Current state and every later change; `None` means signed out.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// Make `identity` the authenticated account of this session.
    fn establish(&self, identity: Identity);

    async fn sign_out(&self) -> Result<(), IdentityError>;
}
