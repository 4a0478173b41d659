use super::{Action, Snapshot};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared handle to the explorer cache.
///
/// Cloning the handle shares the same store. Writers are serialized behind
/// the lock, so actions are applied strictly in submission order; readers
/// get the latest published `Arc<Snapshot>` and may keep it as long as they
/// like.
#[derive(Clone, Default)]
pub struct CacheStore {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The current snapshot
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Apply one action and publish the resulting snapshot
    ///
    /// # Arguments
    /// * `action` - The action to apply; unknown kinds leave the cache as is
    ///
    /// # Returns
    /// The snapshot published by this call. Later dispatches never change it.
    pub async fn dispatch(&self, action: Action) -> Arc<Snapshot> {
        self.dispatch_all([action]).await
    }

    /// Apply actions in order under a single lock acquisition
    pub async fn dispatch_all<I>(&self, actions: I) -> Arc<Snapshot>
    where
        I: IntoIterator<Item = Action>,
    {
        let mut current = self.current.write().await;

        // Reuse the previous snapshot's storage when no reader still holds it.
        let mut next = Arc::unwrap_or_clone(std::mem::take(&mut *current));
        for action in actions {
            debug!("Applying cache action {}", action.kind());
            next = next.apply(action);
        }

        *current = Arc::new(next);
        Arc::clone(&*current)
    }
}
