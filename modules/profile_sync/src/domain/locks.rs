use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutual exclusion keyed by string. Entries are dropped once the
/// last holder or waiter is gone.
#[derive(Default)]
pub struct KeyedLocks {
    inner: DashMap<String, Arc<Mutex<()>>>,
}

pub struct KeyedGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let mutex = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // built before the wait so a cancelled waiter still prunes its entry
        let mut held = KeyedGuard {
            owner: self,
            key: key.to_string(),
            guard: None,
        };
        held.guard = Some(mutex.lock_owned().await);
        held
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // map entry plus nobody else: safe to forget
        self.owner
            .inner
            .remove_if(&self.key, |_, m| Arc::strong_count(m) == 1);
    }
}
