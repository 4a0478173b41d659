//! API Server Module
//!
//! This module implements the explorer's HTTP read API. Every lookup is
//! answered from the cache when possible; on a miss the entity is fetched
//! from the entity source, validated, cached, and returned.
//!
//! Account and address routes are answered by the source on every call;
//! blocks, parcels, transactions and asset schemes they return are fed into
//! the cache on the way out.
//!
//! `POST /dispatch` lets a client push an action straight into the cache.

use super::error::ApiError;
use crate::{
    address::{AssetAddress, PlatformAddress},
    config::ApiConfig,
    error::SourceError,
    source::EntitySource,
    state::{Action, CacheStore},
    types::{
        AccountDoc, AssetBundleDoc, AssetSchemeDoc, AssetSummary, BlockDoc, InvoiceDoc, ParcelDoc,
        TransactionDoc,
    },
    validation::Validator,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_LATEST_LIMIT: usize = 10;
const MAX_LATEST_LIMIT: usize = 100;

/// A block id of this length (`0x` + 64 hex digits) is a hash, anything
/// else is a block number.
const PREFIXED_HASH_LEN: usize = 66;

/// Shared application state that is accessible across all request handlers
///
/// - `store`: The explorer cache
/// - `source`: Where cache misses are fetched from
/// - `validator`: Checks fetched or submitted entities before caching
#[derive(Clone)]
pub struct AppState {
    store: CacheStore,
    source: Arc<dyn EntitySource>,
    validator: Validator,
}

impl AppState {
    pub fn new(store: CacheStore, source: Arc<dyn EntitySource>) -> Self {
        Self {
            store,
            source,
            validator: Validator::new(),
        }
    }
}

/// The main API server struct
pub struct Server {
    config: ApiConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ApiConfig, store: CacheStore, source: Arc<dyn EntitySource>) -> Self {
        Self {
            config,
            state: AppState::new(store, source),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Binds to the configured host and port and serves until the process exits
    pub async fn start(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/blockNumber", get(block_number))
        .route("/block/:id/hash", get(block_hash))
        .route("/block/:id", get(block))
        .route("/parcel/:hash", get(parcel))
        .route("/tx/:hash", get(transaction))
        .route("/tx/:hash/invoice", get(transaction_invoice))
        .route("/asset/:asset_type", get(asset_scheme))
        .route("/asset-txs/:asset_type", get(asset_transactions))
        .route("/account/:address", get(account))
        .route("/account/:address/nonce", get(account_nonce))
        .route("/account/:address/balance", get(account_balance))
        .route("/addr-platform-account/:address", get(platform_account))
        .route("/addr-platform-blocks/:address", get(platform_blocks))
        .route("/addr-platform-parcels/:address", get(platform_parcels))
        .route("/addr-platform-assets/:address", get(platform_assets))
        .route("/addr-asset-utxo/:address", get(asset_utxo))
        .route("/addr-asset-txs/:address", get(asset_address_transactions))
        .route("/latest/blocks", get(latest_blocks))
        .route("/latest/txs", get(latest_transactions))
        .route("/dispatch", post(dispatch))
        .with_state(state)
}

enum BlockId {
    Number(u64),
    Hash(String),
}

fn parse_number(id: &str) -> Result<u64, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid block number: {id}")))
}

fn parse_block_id(validator: &Validator, id: &str) -> Result<BlockId, ApiError> {
    if id.len() == PREFIXED_HASH_LEN {
        Ok(BlockId::Hash(validator.hash("block", id)?))
    } else {
        parse_number(id).map(BlockId::Number)
    }
}

async fn ping(State(state): State<AppState>) -> Result<Json<String>, ApiError> {
    Ok(Json(state.source.ping().await?))
}

async fn block_number(State(state): State<AppState>) -> Result<Json<u64>, ApiError> {
    if let Some(number) = state.store.snapshot().await.best_block_number() {
        return Ok(Json(number));
    }
    let number = state.source.best_block_number().await?;
    state.store.dispatch(Action::SetBestBlockNumber(number)).await;
    Ok(Json(number))
}

async fn block_hash(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>, ApiError> {
    let number = parse_number(&id)?;
    if let Some(block) = state.store.snapshot().await.block_by_number(number) {
        return Ok(Json(block.hash.clone()));
    }
    let hash = state
        .source
        .block_hash(number)
        .await?
        .ok_or(ApiError::NotFound)?;
    let hash = state.validator.hash("block", &hash).map_err(SourceError::from)?;
    Ok(Json(hash))
}

async fn block(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<BlockDoc>>, ApiError> {
    let id = parse_block_id(&state.validator, &id)?;

    let snapshot = state.store.snapshot().await;
    let cached = match &id {
        BlockId::Number(number) => snapshot.block_by_number(*number),
        BlockId::Hash(hash) => snapshot.block_by_hash(hash),
    };
    if let Some(block) = cached {
        return Ok(Json(block));
    }

    let hash = match id {
        BlockId::Hash(hash) => hash,
        BlockId::Number(number) => {
            let hash = state
                .source
                .block_hash(number)
                .await?
                .ok_or(ApiError::NotFound)?;
            state.validator.hash("block", &hash).map_err(SourceError::from)?
        }
    };
    debug!("Block {} not cached, fetching", hash);
    let block = state.source.block(&hash).await?.ok_or(ApiError::NotFound)?;
    let block = state.validator.block(block).map_err(SourceError::from)?;

    state.store.dispatch(Action::CacheBlock(block.clone())).await;
    Ok(Json(Arc::new(block)))
}

async fn parcel(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Arc<ParcelDoc>>, ApiError> {
    let hash = state.validator.hash("parcel", &hash)?;
    if let Some(parcel) = state.store.snapshot().await.parcel(&hash) {
        return Ok(Json(parcel));
    }

    debug!("Parcel {} not cached, fetching", hash);
    let parcel = state.source.parcel(&hash).await?.ok_or(ApiError::NotFound)?;
    let parcel = state.validator.parcel(parcel).map_err(SourceError::from)?;

    state.store.dispatch(Action::CacheParcel(parcel.clone())).await;
    Ok(Json(Arc::new(parcel)))
}

async fn transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Arc<TransactionDoc>>, ApiError> {
    let hash = state.validator.hash("transaction", &hash)?;
    if let Some(tx) = state.store.snapshot().await.transaction(&hash) {
        return Ok(Json(tx));
    }

    debug!("Transaction {} not cached, fetching", hash);
    let tx = state
        .source
        .transaction(&hash)
        .await?
        .ok_or(ApiError::NotFound)?;
    let tx = state.validator.transaction(tx).map_err(SourceError::from)?;

    state.store.dispatch(Action::CacheTransaction(tx.clone())).await;
    Ok(Json(Arc::new(tx)))
}

/// Read-through lookup of an asset scheme.
///
/// # Returns
/// * `Ok(Some(scheme))` from the cache, or fetched from the source and cached
/// * `Ok(None)` if the source does not know the asset type
async fn read_asset_scheme(
    state: &AppState,
    asset_type: &str,
) -> Result<Option<Arc<AssetSchemeDoc>>, SourceError> {
    if let Some(scheme) = state.store.snapshot().await.asset_scheme(asset_type) {
        return Ok(Some(scheme));
    }

    let Some(scheme) = state.source.asset_scheme(asset_type).await? else {
        return Ok(None);
    };
    state
        .store
        .dispatch(Action::CacheAssetScheme {
            asset_type: asset_type.to_string(),
            scheme: scheme.clone(),
        })
        .await;
    Ok(Some(Arc::new(scheme)))
}

async fn asset_scheme(
    State(state): State<AppState>,
    Path(asset_type): Path<String>,
) -> Result<Json<Arc<AssetSchemeDoc>>, ApiError> {
    let asset_type = state.validator.asset_type(&asset_type)?;
    let scheme = read_asset_scheme(&state, &asset_type)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(scheme))
}

async fn asset_transactions(
    State(state): State<AppState>,
    Path(asset_type): Path<String>,
) -> Result<Json<Arc<Vec<TransactionDoc>>>, ApiError> {
    let asset_type = state.validator.asset_type(&asset_type)?;
    if let Some(transactions) = state.store.snapshot().await.asset_transactions(&asset_type) {
        return Ok(Json(transactions));
    }

    let transactions = state.source.asset_transactions(&asset_type).await?;
    let transactions = state
        .validator
        .transactions(transactions)
        .map_err(SourceError::from)?;

    // An empty list may only mean the indexer has not seen the asset yet;
    // keep asking the source until it has something.
    if transactions.is_empty() {
        debug!("No transactions indexed for asset {} yet", asset_type);
        return Ok(Json(Arc::new(transactions)));
    }

    state
        .store
        .dispatch(Action::CacheAssetTransactions {
            asset_type,
            transactions: transactions.clone(),
        })
        .await;
    Ok(Json(Arc::new(transactions)))
}

async fn transaction_invoice(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<InvoiceDoc>, ApiError> {
    let hash = state.validator.hash("transaction", &hash)?;
    let invoice = state
        .source
        .transaction_invoice(&hash)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(invoice))
}

/// Accepts a platform address or a bare 20-byte hex account id
fn parse_account(validator: &Validator, raw: &str) -> Result<String, ApiError> {
    if let Ok(address) = raw.parse::<PlatformAddress>() {
        return Ok(address.account_id_hex());
    }
    Ok(validator.account_id(raw)?)
}

async fn fetch_account(state: &AppState, account_id: &str) -> Result<AccountDoc, SourceError> {
    let (balance, nonce) = tokio::try_join!(
        state.source.balance(account_id),
        state.source.nonce(account_id)
    )?;
    Ok(AccountDoc { balance, nonce })
}

async fn account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountDoc>, ApiError> {
    let account_id = parse_account(&state.validator, &address)?;
    Ok(Json(fetch_account(&state, &account_id).await?))
}

async fn account_nonce(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<u64>, ApiError> {
    let account_id = parse_account(&state.validator, &address)?;
    Ok(Json(state.source.nonce(&account_id).await?))
}

async fn account_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<u64>, ApiError> {
    let account_id = parse_account(&state.validator, &address)?;
    Ok(Json(state.source.balance(&account_id).await?))
}

/// Account id of a platform address, or `None` if it does not parse
fn platform_account_id(address: &str) -> Option<String> {
    match address.parse::<PlatformAddress>() {
        Ok(address) => Some(address.account_id_hex()),
        Err(e) => {
            debug!("Ignoring platform address {}: {}", address, e);
            None
        }
    }
}

/// Public key behind a standard asset address.
///
/// Addresses that do not parse, or that use any other lock script, have no
/// indexed history and yield `None`.
fn asset_owner_pubkey(address: &str) -> Option<String> {
    match address.parse::<AssetAddress>() {
        Ok(address) => address.standard_pubkey_hex(),
        Err(e) => {
            debug!("Ignoring asset address {}: {}", address, e);
            None
        }
    }
}

async fn platform_account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Option<AccountDoc>>, ApiError> {
    let Some(account_id) = platform_account_id(&address) else {
        return Ok(Json(None));
    };
    Ok(Json(Some(fetch_account(&state, &account_id).await?)))
}

async fn platform_blocks(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<BlockDoc>>, ApiError> {
    let Some(account_id) = platform_account_id(&address) else {
        return Ok(Json(Vec::new()));
    };

    let blocks = state
        .source
        .blocks_by_account(&account_id)
        .await?
        .into_iter()
        .map(|block| state.validator.block(block))
        .collect::<Result<Vec<_>, _>>()
        .map_err(SourceError::from)?;

    state
        .store
        .dispatch_all(blocks.iter().cloned().map(Action::CacheBlock))
        .await;
    Ok(Json(blocks))
}

async fn platform_parcels(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<ParcelDoc>>, ApiError> {
    let Some(account_id) = platform_account_id(&address) else {
        return Ok(Json(Vec::new()));
    };

    let parcels = state
        .source
        .parcels_by_account(&account_id)
        .await?
        .into_iter()
        .map(|parcel| state.validator.parcel(parcel))
        .collect::<Result<Vec<_>, _>>()
        .map_err(SourceError::from)?;

    state
        .store
        .dispatch_all(parcels.iter().cloned().map(Action::CacheParcel))
        .await;
    Ok(Json(parcels))
}

async fn platform_assets(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<AssetBundleDoc>>, ApiError> {
    let Some(account_id) = platform_account_id(&address) else {
        return Ok(Json(Vec::new()));
    };

    let mut bundles = state.source.asset_bundles_by_account(&account_id).await?;
    for bundle in &mut bundles {
        bundle.asset = state
            .validator
            .asset(std::mem::take(&mut bundle.asset))
            .map_err(SourceError::from)?;
    }

    let schemes = bundles.iter().filter_map(|bundle| {
        bundle.asset_scheme.clone().map(|scheme| Action::CacheAssetScheme {
            asset_type: bundle.asset.asset_type.clone(),
            scheme,
        })
    });
    state.store.dispatch_all(schemes).await;
    Ok(Json(bundles))
}

async fn asset_utxo(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<AssetBundleDoc>>, ApiError> {
    let Some(pubkey) = asset_owner_pubkey(&address) else {
        return Ok(Json(Vec::new()));
    };

    let mut utxo = Vec::new();
    for asset in state.source.assets_by_pubkey(&pubkey).await? {
        let asset = state.validator.asset(asset).map_err(SourceError::from)?;

        // The index keeps spent outputs too; ask the node which are still live.
        if !state
            .source
            .is_asset_unspent(&asset.transaction_hash, asset.transaction_output_index)
            .await?
        {
            continue;
        }

        let asset_scheme = read_asset_scheme(&state, &asset.asset_type)
            .await?
            .map(|scheme| AssetSchemeDoc::clone(&scheme));
        utxo.push(AssetBundleDoc {
            asset,
            asset_scheme,
        });
    }
    Ok(Json(utxo))
}

async fn asset_address_transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<TransactionDoc>>, ApiError> {
    let Some(pubkey) = asset_owner_pubkey(&address) else {
        return Ok(Json(Vec::new()));
    };

    let transactions = state.source.transactions_by_pubkey(&pubkey).await?;
    let transactions = state
        .validator
        .transactions(transactions)
        .map_err(SourceError::from)?;

    state
        .store
        .dispatch_all(transactions.iter().cloned().map(Action::CacheTransaction))
        .await;
    Ok(Json(transactions))
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    limit: Option<usize>,
}

impl LatestQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LATEST_LIMIT).min(MAX_LATEST_LIMIT)
    }
}

fn unix_time(timestamp: u64) -> Option<String> {
    let seconds = i64::try_from(timestamp).ok()?;
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|time| time.to_rfc3339())
}

/// Row of the latest-blocks listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockListing {
    number: u64,
    hash: String,
    author: String,
    parcel_count: usize,
    transaction_count: usize,
    time: Option<String>,
}

/// Row of the latest-transactions listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionListing {
    #[serde(rename = "type")]
    kind: String,
    hash: String,
    asset: Option<AssetSummary>,
    time: Option<String>,
}

async fn latest_blocks(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Json<Vec<BlockListing>> {
    let snapshot = state.store.snapshot().await;
    let listing = snapshot
        .latest_blocks(query.limit())
        .iter()
        .map(|block| BlockListing {
            number: block.number,
            hash: block.hash.clone(),
            author: block.author.clone(),
            parcel_count: block.parcels.len(),
            transaction_count: block.transaction_hashes().len(),
            time: unix_time(block.timestamp),
        })
        .collect();
    Json(listing)
}

async fn latest_transactions(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Json<Vec<TransactionListing>> {
    let snapshot = state.store.snapshot().await;
    let listing = snapshot
        .latest_transactions(query.limit())
        .iter()
        .map(|tx| TransactionListing {
            kind: tx.kind().to_string(),
            hash: tx.hash().to_string(),
            asset: tx.asset_summary(),
            time: unix_time(tx.timestamp()),
        })
        .collect();
    Json(listing)
}

/// Acknowledgement returned by `POST /dispatch`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchAck {
    #[serde(rename = "type")]
    kind: String,
    recognized: bool,
    best_block_number: Option<u64>,
}

async fn dispatch(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<DispatchAck>, ApiError> {
    let action = state.validator.action_from_json(body)?;
    let kind = action.kind().to_string();
    let recognized = action.is_recognized();
    if !recognized {
        warn!("Unrecognized action kind {}, cache left unchanged", kind);
    }

    let snapshot = state.store.dispatch(action).await;
    Ok(Json(DispatchAck {
        kind,
        recognized,
        best_block_number: snapshot.best_block_number(),
    }))
}
