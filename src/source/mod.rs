//! Entity Source Module
//!
//! The explorer never computes chain data itself. Blocks, parcels,
//! transactions and asset data come from an external node / indexer through
//! the `EntitySource` trait; `RpcSource` is the JSON-RPC implementation.

mod rpc;

#[cfg(test)]
pub(crate) mod fake;

pub use rpc::RpcSource;

use crate::{
    error::SourceError,
    types::{
        AssetBundleDoc, AssetDoc, AssetSchemeDoc, BlockDoc, InvoiceDoc, ParcelDoc, TransactionDoc,
    },
};
use async_trait::async_trait;

/// Where cache misses are filled from.
///
/// Lookups return `Ok(None)` when the entity does not exist; `Err` is kept
/// for transport or decoding failures.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn ping(&self) -> Result<String, SourceError>;

    async fn best_block_number(&self) -> Result<u64, SourceError>;

    async fn block_hash(&self, number: u64) -> Result<Option<String>, SourceError>;

    async fn block(&self, hash: &str) -> Result<Option<BlockDoc>, SourceError>;

    async fn parcel(&self, hash: &str) -> Result<Option<ParcelDoc>, SourceError>;

    async fn transaction(&self, hash: &str) -> Result<Option<TransactionDoc>, SourceError>;

    async fn asset_scheme(&self, asset_type: &str) -> Result<Option<AssetSchemeDoc>, SourceError>;

    /// All indexed transactions touching `asset_type`, oldest first
    async fn asset_transactions(&self, asset_type: &str) -> Result<Vec<TransactionDoc>, SourceError>;

    async fn transaction_invoice(&self, hash: &str) -> Result<Option<InvoiceDoc>, SourceError>;

    /// Current balance of a platform account; unknown accounts hold zero.
    ///
    /// Account ids are 20-byte lowercase hex without `0x`, like every other key.
    async fn balance(&self, account_id: &str) -> Result<u64, SourceError>;

    async fn nonce(&self, account_id: &str) -> Result<u64, SourceError>;

    /// Blocks authored by the account
    async fn blocks_by_account(&self, account_id: &str) -> Result<Vec<BlockDoc>, SourceError>;

    /// Parcels sent by the account
    async fn parcels_by_account(&self, account_id: &str) -> Result<Vec<ParcelDoc>, SourceError>;

    async fn asset_bundles_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<AssetBundleDoc>, SourceError>;

    /// Asset outputs ever locked to `pubkey` by the standard script, spent or not
    async fn assets_by_pubkey(&self, pubkey: &str) -> Result<Vec<AssetDoc>, SourceError>;

    /// Whether output `index` of transaction `hash` is still unspent
    async fn is_asset_unspent(&self, hash: &str, index: u64) -> Result<bool, SourceError>;

    async fn transactions_by_pubkey(&self, pubkey: &str) -> Result<Vec<TransactionDoc>, SourceError>;
}
