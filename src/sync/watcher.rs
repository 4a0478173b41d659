//! Best Block Watcher Module
//!
//! Polls the entity source for the chain head and feeds it into the cache.
//! When prefetching is enabled the new head block is fetched and cached as
//! well, so the home page listing is warm before anyone asks for it.

use crate::{
    config::SyncConfig,
    error::SourceError,
    source::EntitySource,
    state::{Action, CacheStore},
    types::BlockDoc,
    validation::Validator,
};
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

pub struct BestBlockWatcher {
    config: SyncConfig,
    store: CacheStore,
    source: Arc<dyn EntitySource>,
    validator: Validator,
}

impl BestBlockWatcher {
    pub fn new(config: SyncConfig, store: CacheStore, source: Arc<dyn EntitySource>) -> Self {
        Self {
            config,
            store,
            source,
            validator: Validator::new(),
        }
    }

    /// Run the polling loop forever.
    ///
    /// Source failures are logged and retried on the next tick.
    pub async fn start(self) -> anyhow::Result<()> {
        info!(
            "Best block watcher starting: poll_interval_ms={}, prefetch_blocks={}",
            self.config.poll_interval_ms, self.config.prefetch_blocks
        );
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            match self.poll_once().await {
                Ok(Some(number)) => info!("Best block is now #{}", number),
                Ok(None) => debug!("Best block unchanged"),
                Err(e) => warn!("Failed to poll best block: {}", e),
            }
            sleep(interval).await;
        }
    }

    /// Ask the source for the head once.
    ///
    /// The new head number and its prefetched block are dispatched together,
    /// so a failed prefetch leaves the cache as it was and the whole step is
    /// retried on the next tick. A head whose block the source did not have
    /// yet is fetched again on later ticks until it is cached.
    ///
    /// # Returns
    /// * `Ok(Some(n))` if the cached best block number changed to `n`
    /// * `Ok(None)` if it was already current
    /// * `Err` if the source could not be reached or returned a malformed block
    pub async fn poll_once(&self) -> Result<Option<u64>, SourceError> {
        let reported = self.source.best_block_number().await?;
        let snapshot = self.store.snapshot().await;

        // The head may move backwards after a reorg; take it as reported.
        let head_changed = snapshot.best_block_number() != Some(reported);
        let head_missing =
            self.config.prefetch_blocks && snapshot.block_by_number(reported).is_none();
        drop(snapshot);

        if !head_changed && !head_missing {
            return Ok(None);
        }

        let mut actions = Vec::with_capacity(2);
        if head_changed {
            actions.push(Action::SetBestBlockNumber(reported));
        }
        if head_missing {
            if let Some(block) = self.prefetch_block(reported).await? {
                actions.push(Action::CacheBlock(block));
            }
        }
        if !actions.is_empty() {
            self.store.dispatch_all(actions).await;
        }

        Ok(head_changed.then_some(reported))
    }

    async fn prefetch_block(&self, number: u64) -> Result<Option<BlockDoc>, SourceError> {
        let Some(hash) = self.source.block_hash(number).await? else {
            debug!("Source has no hash for block #{} yet", number);
            return Ok(None);
        };
        let hash = self.validator.hash("block", &hash)?;
        match self.source.block(&hash).await? {
            Some(block) => Ok(Some(self.validator.block(block)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::FakeSource;

    fn hash(n: u64) -> String {
        format!("{n:064x}")
    }

    fn watcher(source: Arc<FakeSource>, prefetch_blocks: bool) -> (BestBlockWatcher, CacheStore) {
        let store = CacheStore::new();
        let config = SyncConfig {
            poll_interval_ms: 10,
            prefetch_blocks,
        };
        (BestBlockWatcher::new(config, store.clone(), source), store)
    }

    #[tokio::test]
    async fn test_poll_updates_best_block_and_prefetches_head() {
        let source = Arc::new(FakeSource::default().with_block(BlockDoc {
            number: 7,
            hash: hash(7),
            ..Default::default()
        }));
        source.set_best_block_number(7);
        let (watcher, store) = watcher(source, true);

        assert_eq!(watcher.poll_once().await.unwrap(), Some(7));

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.best_block_number(), Some(7));
        assert_eq!(snapshot.block_by_number(7).unwrap().hash, hash(7));
        assert!(snapshot.block_by_hash(&hash(7)).is_some());
    }

    #[tokio::test]
    async fn test_unchanged_head_is_not_redispatched() {
        let source = Arc::new(FakeSource::default());
        source.set_best_block_number(3);
        let (watcher, store) = watcher(source, false);

        assert_eq!(watcher.poll_once().await.unwrap(), Some(3));
        let first = store.snapshot().await;
        assert_eq!(watcher.poll_once().await.unwrap(), None);
        assert!(Arc::ptr_eq(&first, &store.snapshot().await));
    }

    #[tokio::test]
    async fn test_head_moving_backwards_is_accepted() {
        let source = Arc::new(FakeSource::default());
        let (watcher, store) = watcher(Arc::clone(&source), false);

        source.set_best_block_number(10);
        watcher.poll_once().await.unwrap();
        source.set_best_block_number(9);
        assert_eq!(watcher.poll_once().await.unwrap(), Some(9));
        assert_eq!(store.snapshot().await.best_block_number(), Some(9));
    }

    #[tokio::test]
    async fn test_missing_head_block_is_not_an_error() {
        let source = Arc::new(FakeSource::default());
        source.set_best_block_number(4);
        let (watcher, store) = watcher(source, true);

        assert_eq!(watcher.poll_once().await.unwrap(), Some(4));
        assert!(store.snapshot().await.blocks_by_number().is_empty());
    }

    #[tokio::test]
    async fn test_source_failure_leaves_cache_untouched() {
        let source = Arc::new(FakeSource::default());
        source.set_offline(true);
        let (watcher, store) = watcher(source, true);

        assert!(matches!(
            watcher.poll_once().await,
            Err(SourceError::Unavailable(_))
        ));
        assert_eq!(store.snapshot().await.best_block_number(), None);
    }

    #[tokio::test]
    async fn test_failed_head_prefetch_is_retried_on_next_poll() {
        let source = Arc::new(FakeSource::default().with_block(BlockDoc {
            number: 7,
            hash: hash(7),
            ..Default::default()
        }));
        source.set_best_block_number(7);
        source.set_failing_blocks(true);
        let (watcher, store) = watcher(Arc::clone(&source), true);

        assert!(watcher.poll_once().await.is_err());
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.best_block_number(), None);
        assert!(snapshot.block_by_number(7).is_none());

        source.set_failing_blocks(false);
        assert_eq!(watcher.poll_once().await.unwrap(), Some(7));
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.best_block_number(), Some(7));
        assert_eq!(snapshot.block_by_number(7).unwrap().hash, hash(7));
    }

    #[tokio::test]
    async fn test_malformed_head_block_is_not_cached() {
        let source = Arc::new(FakeSource::default().with_block(BlockDoc {
            number: 5,
            hash: "not-a-hash".to_string(),
            ..Default::default()
        }));
        source.set_best_block_number(5);
        let (watcher, store) = watcher(source, true);

        assert!(matches!(
            watcher.poll_once().await,
            Err(SourceError::Malformed(_))
        ));
        assert_eq!(store.snapshot().await.best_block_number(), None);
        // Still behind, so the next tick tries again.
        assert!(watcher.poll_once().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_head_block_is_looked_up_again() {
        let source = Arc::new(FakeSource::default());
        source.set_best_block_number(4);
        let (watcher, store) = watcher(Arc::clone(&source), true);

        assert_eq!(watcher.poll_once().await.unwrap(), Some(4));
        assert!(store.snapshot().await.block_by_number(4).is_none());

        let calls = source.calls();
        assert_eq!(watcher.poll_once().await.unwrap(), None);
        // Head unchanged but still missing: best number, then the hash lookup.
        assert_eq!(source.calls(), calls + 2);
    }
}
