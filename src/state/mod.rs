//! State Management Module
//!
//! This module provides the in-memory cache of blockchain entities the
//! explorer has already fetched: blocks (by number and by hash), parcels,
//! transactions, asset schemes and per-asset transaction lists.
//!
//! Updates are discrete `Action`s folded into immutable `Snapshot`s by a
//! pure `reduce`; `CacheStore` owns the current snapshot.

mod action;
mod cache;
mod snapshot;


pub use action::{
    Action, BEST_BLOCK_NUMBER, CACHE_ASSET_SCHEME, CACHE_ASSET_TRANSACTIONS, CACHE_BLOCK,
    CACHE_PARCEL, CACHE_TRANSACTION,
};
pub use cache::CacheStore;
pub use snapshot::{Snapshot, reduce};
