use crate::types::{AssetSchemeDoc, BlockDoc, ParcelDoc, TransactionDoc};

pub const BEST_BLOCK_NUMBER: &str = "BEST_BLOCK_NUMBER_ACTION";
pub const CACHE_BLOCK: &str = "CACHE_BLOCK";
pub const CACHE_PARCEL: &str = "CACHE_PARCEL";
pub const CACHE_TRANSACTION: &str = "CACHE_TRANSACTION";
pub const CACHE_ASSET_SCHEME: &str = "CACHE_ASSET_SCHEME";
pub const CACHE_ASSET_TRANSACTIONS: &str = "CACHE_ASSET_TRANSACTIONS";

/// A single update request against the cache.
///
/// Each variant fully replaces whatever was stored under its key(s).
/// `Unknown` carries the kind string of an action this build does not
/// understand; applying it leaves the snapshot unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetBestBlockNumber(u64),
    CacheBlock(BlockDoc),
    CacheParcel(ParcelDoc),
    CacheTransaction(TransactionDoc),
    CacheAssetScheme {
        asset_type: String,
        scheme: AssetSchemeDoc,
    },
    CacheAssetTransactions {
        asset_type: String,
        transactions: Vec<TransactionDoc>,
    },
    Unknown(String),
}

impl Action {
    /// The wire name of this action kind
    pub fn kind(&self) -> &str {
        match self {
            Action::SetBestBlockNumber(_) => BEST_BLOCK_NUMBER,
            Action::CacheBlock(_) => CACHE_BLOCK,
            Action::CacheParcel(_) => CACHE_PARCEL,
            Action::CacheTransaction(_) => CACHE_TRANSACTION,
            Action::CacheAssetScheme { .. } => CACHE_ASSET_SCHEME,
            Action::CacheAssetTransactions { .. } => CACHE_ASSET_TRANSACTIONS,
            Action::Unknown(kind) => kind,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Action::Unknown(_))
    }
}
