//! Snapshot Module
//!
//! A `Snapshot` is the complete value of the explorer cache at one point in
//! its history. Snapshots are never mutated once published; `reduce` builds
//! the next one from the previous snapshot and a single `Action`.
//!
//! # Sharing
//! Every index is an `Arc<HashMap<_, Arc<_>>>`. A transition copies only the
//! index it touches (copy-on-write through `Arc::make_mut`), and cloning a
//! whole snapshot only bumps reference counts.

use super::action::Action;
use crate::types::{AssetSchemeDoc, BlockDoc, ParcelDoc, TransactionDoc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Index<K, V> = Arc<HashMap<K, Arc<V>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    best_block_number: Option<u64>,
    blocks_by_number: Index<u64, BlockDoc>,
    blocks_by_hash: Index<String, BlockDoc>,
    parcel_by_hash: Index<String, ParcelDoc>,
    transaction_by_hash: Index<String, TransactionDoc>,
    asset_scheme_by_asset_type: Index<String, AssetSchemeDoc>,
    transactions_by_asset_type: Index<String, Vec<TransactionDoc>>,
}

/// Applies one action to a snapshot and returns the next snapshot.
///
/// Pure: no I/O, no hidden state. `state` is left untouched.
pub fn reduce(state: &Snapshot, action: Action) -> Snapshot {
    state.clone().apply(action)
}

impl Snapshot {
    /// The empty initial snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Consuming form of [`reduce`]. Indices not shared with another
    /// snapshot are updated in place.
    pub fn apply(mut self, action: Action) -> Self {
        match action {
            Action::SetBestBlockNumber(number) => {
                self.best_block_number = Some(number);
            }
            Action::CacheBlock(block) => {
                let block = Arc::new(block);
                Arc::make_mut(&mut self.blocks_by_number).insert(block.number, Arc::clone(&block));
                Arc::make_mut(&mut self.blocks_by_hash).insert(block.hash.clone(), block);
            }
            Action::CacheParcel(parcel) => {
                Arc::make_mut(&mut self.parcel_by_hash).insert(parcel.hash.clone(), Arc::new(parcel));
            }
            Action::CacheTransaction(transaction) => {
                Arc::make_mut(&mut self.transaction_by_hash)
                    .insert(transaction.hash().to_string(), Arc::new(transaction));
            }
            Action::CacheAssetScheme { asset_type, scheme } => {
                Arc::make_mut(&mut self.asset_scheme_by_asset_type).insert(asset_type, Arc::new(scheme));
            }
            Action::CacheAssetTransactions {
                asset_type,
                transactions,
            } => {
                Arc::make_mut(&mut self.transactions_by_asset_type)
                    .insert(asset_type, Arc::new(transactions));
            }
            Action::Unknown(kind) => {
                debug!("Ignoring unrecognized cache action {}", kind);
            }
        }
        self
    }

    /// Latest chain height seen, `None` until the first head is recorded
    pub fn best_block_number(&self) -> Option<u64> {
        self.best_block_number
    }

    /// Raw index views, mostly for tests and listings.
    pub fn blocks_by_number(&self) -> &HashMap<u64, Arc<BlockDoc>> {
        &self.blocks_by_number
    }

    pub fn blocks_by_hash(&self) -> &HashMap<String, Arc<BlockDoc>> {
        &self.blocks_by_hash
    }

    pub fn parcel_by_hash(&self) -> &HashMap<String, Arc<ParcelDoc>> {
        &self.parcel_by_hash
    }

    pub fn transaction_by_hash(&self) -> &HashMap<String, Arc<TransactionDoc>> {
        &self.transaction_by_hash
    }

    pub fn asset_scheme_by_asset_type(&self) -> &HashMap<String, Arc<AssetSchemeDoc>> {
        &self.asset_scheme_by_asset_type
    }

    pub fn transactions_by_asset_type(&self) -> &HashMap<String, Arc<Vec<TransactionDoc>>> {
        &self.transactions_by_asset_type
    }

    /// Look up a cached block by height
    ///
    /// # Arguments
    /// * `number` - Block number
    ///
    /// # Returns
    /// A shared handle to the block, or `None` on a cache miss. The handle
    /// stays valid after later snapshots replace the entry.
    pub fn block_by_number(&self, number: u64) -> Option<Arc<BlockDoc>> {
        self.blocks_by_number.get(&number).cloned()
    }

    /// Look up a cached block by hash
    ///
    /// # Arguments
    /// * `hash` - Normalized block hash (lowercase hex, no `0x`)
    ///
    /// # Returns
    /// The same block `block_by_number` returns for its height, or `None`
    pub fn block_by_hash(&self, hash: &str) -> Option<Arc<BlockDoc>> {
        self.blocks_by_hash.get(hash).cloned()
    }

    pub fn parcel(&self, hash: &str) -> Option<Arc<ParcelDoc>> {
        self.parcel_by_hash.get(hash).cloned()
    }

    /// Keyed by `data.hash` of the tagged document
    pub fn transaction(&self, hash: &str) -> Option<Arc<TransactionDoc>> {
        self.transaction_by_hash.get(hash).cloned()
    }

    pub fn asset_scheme(&self, asset_type: &str) -> Option<Arc<AssetSchemeDoc>> {
        self.asset_scheme_by_asset_type.get(asset_type).cloned()
    }

    /// Transactions cached for an asset type, in the order they were cached.
    ///
    /// # Returns
    /// * `Some(list)` for an asset type that has a cached list, even an empty one
    /// * `None` if nothing was cached for it
    pub fn asset_transactions(&self, asset_type: &str) -> Option<Arc<Vec<TransactionDoc>>> {
        self.transactions_by_asset_type.get(asset_type).cloned()
    }

    /// Up to `limit` cached blocks, highest number first
    ///
    /// # Arguments
    /// * `limit` - Maximum number of blocks returned
    pub fn latest_blocks(&self, limit: usize) -> Vec<Arc<BlockDoc>> {
        // Collect handles only, the documents themselves are not copied.
        let mut blocks: Vec<_> = self.blocks_by_number.values().cloned().collect();
        blocks.sort_by(|a, b| b.number.cmp(&a.number));
        blocks.truncate(limit);
        blocks
    }

    /// Up to `limit` cached transactions, newest first.
    ///
    /// Transactions sharing a timestamp are ordered by hash so the listing is
    /// stable across calls.
    pub fn latest_transactions(&self, limit: usize) -> Vec<Arc<TransactionDoc>> {
        let mut transactions: Vec<_> = self.transaction_by_hash.values().cloned().collect();
        transactions.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.hash().cmp(b.hash()))
        });
        transactions.truncate(limit);
        transactions
    }
}
