use async_trait::async_trait;
use tokio::sync::watch;

use crate::contract::model::Identity;
use crate::domain::ports::{IdentityError, IdentitySessionSource};

/// In-process session state, the server-side counterpart of a client SDK's
/// "current user".
pub struct LocalSessionSource {
    current: watch::Sender<Option<Identity>>,
}

impl LocalSessionSource {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// A session that starts out authenticated, as after a restore.
    pub fn restored(identity: Identity) -> Self {
        let (current, _) = watch::channel(Some(identity));
        Self { current }
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }
}

impl Default for LocalSessionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentitySessionSource for LocalSessionSource {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    fn establish(&self, identity: Identity) {
        self.current.send_replace(Some(identity));
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.current.send_replace(None);
        Ok(())
    }
}
