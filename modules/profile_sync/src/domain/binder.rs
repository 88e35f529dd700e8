use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::contract::error::ProfileSyncError;
use crate::contract::model::{Identity, Profile, SessionView};
use crate::domain::reconciler::Reconciler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderState {
    Unauthenticated,
    AuthenticatingProfile { identity: Identity },
    Ready { identity: Identity, profile: Profile },
    Error { identity: Identity, error: ProfileSyncError },
}

impl BinderState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, BinderState::AuthenticatingProfile { .. })
    }

    pub fn view(&self) -> SessionView {
        match self {
            BinderState::Unauthenticated => SessionView::default(),
            BinderState::AuthenticatingProfile { identity } => SessionView {
                identity: Some(identity.clone()),
                role: None,
                loading: true,
            },
            BinderState::Ready { identity, profile } => SessionView {
                identity: Some(identity.clone()),
                role: Some(profile.role),
                loading: false,
            },
            BinderState::Error { identity, .. } => SessionView {
                identity: Some(identity.clone()),
                role: None,
                loading: false,
            },
        }
    }

    /// Identifier whose profile is being or has been bound successfully.
    fn bound_identifier(&self) -> Option<&str> {
        match self {
            BinderState::AuthenticatingProfile { identity } | BinderState::Ready { identity, .. } => {
                Some(&identity.identifier)
            }
            _ => None,
        }
    }
}

/// Wires identity-session transitions to profile reconciliation.
pub struct SessionBinder {
    reconciler: Arc<Reconciler>,
    // guards every state write; bumped on each transition
    generation: Mutex<u64>,
    state: watch::Sender<BinderState>,
}

impl SessionBinder {
    pub fn new(reconciler: Arc<Reconciler>) -> Arc<Self> {
        let (state, _) = watch::channel(BinderState::Unauthenticated);
        Arc::new(Self {
            reconciler,
            generation: Mutex::new(0),
            state,
        })
    }

    pub fn state(&self) -> BinderState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> SessionView {
        self.state.borrow().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<BinderState> {
        self.state.subscribe()
    }

    /// Process one session notification to completion.
    pub async fn handle(&self, identity: Option<Identity>) {
        if let Some((generation, identity)) = self.transition(identity) {
            self.authenticate(generation, identity).await;
        }
    }

    /// Bind a profile obtained elsewhere (the sign-up path) without another fetch.
    pub fn bind(&self, identity: Identity, profile: Profile) {
        let mut generation = self.generation.lock();
        *generation += 1;
        info!(identity = %identity.identifier, "session bound");
        self.state.send_replace(BinderState::Ready { identity, profile });
    }

    /// Resolves with the first state that is not `AuthenticatingProfile`.
    pub async fn wait_settled(&self) -> BinderState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(BinderState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Follow `source` until it closes. Transitions are applied in
    /// notification order; reconciliations run on their own tasks.
    pub fn drive(self: &Arc<Self>, mut source: watch::Receiver<Option<Identity>>) -> JoinHandle<()> {
        let binder = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let current = source.borrow_and_update().clone();
                if let Some((generation, identity)) = binder.transition(current) {
                    let binder = Arc::clone(&binder);
                    tokio::spawn(async move { binder.authenticate(generation, identity).await });
                }
                if source.changed().await.is_err() {
                    debug!("session source closed");
                    break;
                }
            }
        })
    }

    /// Returns the generation to reconcile under, or `None` when nothing
    /// needs reconciling.
    fn transition(&self, identity: Option<Identity>) -> Option<(u64, Identity)> {
        let mut generation = self.generation.lock();
        match identity {
            None => {
                if *self.state.borrow() != BinderState::Unauthenticated {
                    *generation += 1;
                    info!("session signed out");
                    self.state.send_replace(BinderState::Unauthenticated);
                }
                None
            }
            Some(identity) => {
                let same = self.state.borrow().bound_identifier() == Some(identity.identifier.as_str());
                if same {
                    debug!(identity = %identity.identifier, "coalesced session notification");
                    return None;
                }
                *generation += 1;
                self.state.send_replace(BinderState::AuthenticatingProfile {
                    identity: identity.clone(),
                });
                Some((*generation, identity))
            }
        }
    }

    async fn authenticate(&self, generation: u64, identity: Identity) {
        let result = self.reconciler.reconcile(&identity.identifier, None).await;

        let current = self.generation.lock();
        if *current != generation {
            debug!(identity = %identity.identifier, "discarding stale reconciliation");
            return;
        }
        let next = match result {
            Ok(profile) => {
                info!(identity = %identity.identifier, role = %profile.role, "session ready");
                BinderState::Ready { identity, profile }
            }
            Err(e) => {
                warn!(identity = %identity.identifier, error = %e, "profile reconciliation failed");
                BinderState::Error {
                    identity,
                    error: e.into(),
                }
            }
        };
        self.state.send_replace(next);
    }
}
