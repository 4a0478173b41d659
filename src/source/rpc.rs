//! JSON-RPC entity source
//!
//! Talks to a CodeChain node (plus the explorer indexer's extension methods)
//! over HTTP, using the ethers JSON-RPC transport.

use super::EntitySource;
use crate::{
    config::SourceConfig,
    error::{MalformedEntityError, SourceError},
    types::{
        AssetBundleDoc, AssetDoc, AssetSchemeDoc, BlockDoc, InvoiceDoc, ParcelDoc, TransactionDoc,
    },
};
use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

const PING: &str = "ping";
const BEST_BLOCK_NUMBER: &str = "chain_getBestBlockNumber";
const BLOCK_HASH: &str = "chain_getBlockHash";
const BLOCK_BY_HASH: &str = "chain_getBlockByHash";
const PARCEL: &str = "chain_getParcel";
const TRANSACTION: &str = "chain_getTransaction";
const ASSET_SCHEME: &str = "chain_getAssetSchemeByType";
const ASSET_TRANSACTIONS: &str = "explorer_getTransactionsByAssetType";
const TRANSACTION_INVOICE: &str = "chain_getTransactionInvoice";
const BALANCE: &str = "chain_getBalance";
const NONCE: &str = "chain_getNonce";
const ASSET: &str = "chain_getAsset";
const BLOCKS_BY_ACCOUNT: &str = "explorer_getBlocksByAccountId";
const PARCELS_BY_ACCOUNT: &str = "explorer_getParcelsByAccountId";
const ASSET_BUNDLES_BY_ACCOUNT: &str = "explorer_getAssetBundlesByAccountId";
const ASSETS_BY_PUBKEY: &str = "explorer_getAssetsByPubKey";
const TRANSACTIONS_BY_PUBKEY: &str = "explorer_getTransactionsByPubKey";

pub struct RpcSource {
    provider: Provider<Http>,
}

impl RpcSource {
    /// Creates a source for the node at `config.rpc_url`
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let provider =
            Provider::<Http>::try_from(config.rpc_url.as_str()).map_err(|e| SourceError::InvalidUrl {
                url: config.rpc_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { provider })
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, SourceError>
    where
        P: Debug + Serialize + Send + Sync,
        R: Debug + Serialize + DeserializeOwned + Send,
    {
        debug!("RPC {} {:?}", method, params);
        Ok(self.provider.request(method, params).await?)
    }

    /// Calls an indexer list method; a `null` result is an empty list
    async fn list<R>(&self, method: &str, key: &str) -> Result<Vec<R>, SourceError>
    where
        R: Debug + Serialize + DeserializeOwned + Send,
    {
        let items: Option<Vec<R>> = self.call(method, [prefixed(key)]).await?;
        Ok(items.unwrap_or_default())
    }
}

/// Node methods take hashes with the `0x` prefix
fn prefixed(hash: &str) -> String {
    format!("0x{hash}")
}

/// Balances and nonces arrive as `0x` hex strings or plain numbers
fn quantity(method: &str, value: Value) -> Result<u64, SourceError> {
    let parsed = match &value {
        Value::Null => Some(0),
        Value::Number(number) => number.as_u64(),
        Value::String(text) => match text.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => text.parse().ok(),
        },
        _ => None,
    };
    parsed.ok_or_else(|| {
        MalformedEntityError::new("quantity", format!("{method} returned {value}")).into()
    })
}

#[async_trait]
impl EntitySource for RpcSource {
    async fn ping(&self) -> Result<String, SourceError> {
        self.call(PING, ()).await
    }

    async fn best_block_number(&self) -> Result<u64, SourceError> {
        self.call(BEST_BLOCK_NUMBER, ()).await
    }

    async fn block_hash(&self, number: u64) -> Result<Option<String>, SourceError> {
        self.call(BLOCK_HASH, [number]).await
    }

    async fn block(&self, hash: &str) -> Result<Option<BlockDoc>, SourceError> {
        self.call(BLOCK_BY_HASH, [prefixed(hash)]).await
    }

    async fn parcel(&self, hash: &str) -> Result<Option<ParcelDoc>, SourceError> {
        self.call(PARCEL, [prefixed(hash)]).await
    }

    async fn transaction(&self, hash: &str) -> Result<Option<TransactionDoc>, SourceError> {
        self.call(TRANSACTION, [prefixed(hash)]).await
    }

    async fn asset_scheme(&self, asset_type: &str) -> Result<Option<AssetSchemeDoc>, SourceError> {
        self.call(ASSET_SCHEME, [prefixed(asset_type)]).await
    }

    async fn asset_transactions(&self, asset_type: &str) -> Result<Vec<TransactionDoc>, SourceError> {
        self.list(ASSET_TRANSACTIONS, asset_type).await
    }

    async fn transaction_invoice(&self, hash: &str) -> Result<Option<InvoiceDoc>, SourceError> {
        self.call(TRANSACTION_INVOICE, [prefixed(hash)]).await
    }

    async fn balance(&self, account_id: &str) -> Result<u64, SourceError> {
        let value: Value = self.call(BALANCE, [prefixed(account_id)]).await?;
        quantity(BALANCE, value)
    }

    async fn nonce(&self, account_id: &str) -> Result<u64, SourceError> {
        let value: Value = self.call(NONCE, [prefixed(account_id)]).await?;
        quantity(NONCE, value)
    }

    async fn blocks_by_account(&self, account_id: &str) -> Result<Vec<BlockDoc>, SourceError> {
        self.list(BLOCKS_BY_ACCOUNT, account_id).await
    }

    async fn parcels_by_account(&self, account_id: &str) -> Result<Vec<ParcelDoc>, SourceError> {
        self.list(PARCELS_BY_ACCOUNT, account_id).await
    }

    async fn asset_bundles_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<AssetBundleDoc>, SourceError> {
        self.list(ASSET_BUNDLES_BY_ACCOUNT, account_id).await
    }

    async fn assets_by_pubkey(&self, pubkey: &str) -> Result<Vec<AssetDoc>, SourceError> {
        self.list(ASSETS_BY_PUBKEY, pubkey).await
    }

    async fn is_asset_unspent(&self, hash: &str, index: u64) -> Result<bool, SourceError> {
        let asset: Option<Value> = self.call(ASSET, (prefixed(hash), index)).await?;
        Ok(asset.is_some())
    }

    async fn transactions_by_pubkey(&self, pubkey: &str) -> Result<Vec<TransactionDoc>, SourceError> {
        self.list(TRANSACTIONS_BY_PUBKEY, pubkey).await
    }
}
