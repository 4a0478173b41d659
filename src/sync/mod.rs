//! Chain Head Sync Module
//!
//! Keeps the cached best block number current by polling the entity source
//! in the background.

mod watcher;
pub use watcher::BestBlockWatcher;
