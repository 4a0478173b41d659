//! This crate implements the caching core of a CodeChain block explorer.
//! It keeps an in-memory, multi-index cache of blocks, parcels, transactions
//! and assets, fills it from an external node / indexer, and serves it over HTTP.

pub mod types; // Entity documents: blocks, parcels, transactions, asset schemes.
pub mod address; // Platform and asset address decoding.
pub mod error; // Error types shared across modules.
pub mod state; // The cache store: snapshots, actions and the reducer.
pub mod validation; // Boundary checks before entities reach the store.
pub mod source; // The external entity source and its JSON-RPC client.
pub mod sync; // Background polling of the chain head.
pub mod api; // HTTP read-through API.
pub mod config; // Defines and loads system configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use state::{Action, CacheStore, Snapshot};
