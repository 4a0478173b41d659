use crate::{
    error::MalformedEntityError,
    state::{
        Action, BEST_BLOCK_NUMBER, CACHE_ASSET_SCHEME, CACHE_ASSET_TRANSACTIONS, CACHE_BLOCK,
        CACHE_PARCEL, CACHE_TRANSACTION,
    },
    types::{AssetDoc, AssetSchemeDoc, BlockDoc, ParcelDoc, TransactionDoc},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Length of a 32-byte hash in hex, without prefix
const HASH_HEX_LEN: usize = 64;

/// Length of a 20-byte account id in hex, without prefix
const ACCOUNT_ID_HEX_LEN: usize = 40;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetSchemePayload {
    asset_type: String,
    asset_scheme: AssetSchemeDoc,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetTransactionsPayload {
    asset_type: String,
    transactions: Vec<TransactionDoc>,
}

/// Checks entities coming from outside before they are turned into actions.
///
/// The cache store itself trusts its input; everything that can be wrong
/// with an entity is caught here and reported as a `MalformedEntityError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Build an action from its wire form `{ "type": <kind>, "data": <payload> }`.
    ///
    /// # Arguments
    /// * `value` - The decoded request body
    ///
    /// # Returns
    /// * `Ok(action)` with every key of the payload normalized
    /// * `Err` if `type` is missing or the payload of a known kind is malformed
    ///
    /// Kinds this build does not know become `Action::Unknown`.
    pub fn action_from_json(&self, value: Value) -> Result<Action, MalformedEntityError> {
        let Value::Object(mut object) = value else {
            return Err(MalformedEntityError::new("action", "expected a JSON object"));
        };
        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(_) => return Err(MalformedEntityError::new("action", "`type` must be a string")),
            None => return Err(MalformedEntityError::new("action", "missing `type`")),
        };
        let data = object.remove("data").unwrap_or(Value::Null);

        debug!("Validating {} action", kind);
        let action = match kind.as_str() {
            BEST_BLOCK_NUMBER => Action::SetBestBlockNumber(decode("best block number", data)?),
            CACHE_BLOCK => Action::CacheBlock(self.block(decode("block", data)?)?),
            CACHE_PARCEL => Action::CacheParcel(self.parcel(decode("parcel", data)?)?),
            CACHE_TRANSACTION => Action::CacheTransaction(self.transaction(decode("transaction", data)?)?),
            CACHE_ASSET_SCHEME => {
                let payload: AssetSchemePayload = decode("asset scheme", data)?;
                Action::CacheAssetScheme {
                    asset_type: self.asset_type(&payload.asset_type)?,
                    scheme: payload.asset_scheme,
                }
            }
            CACHE_ASSET_TRANSACTIONS => {
                let payload: AssetTransactionsPayload = decode("asset transactions", data)?;
                Action::CacheAssetTransactions {
                    asset_type: self.asset_type(&payload.asset_type)?,
                    transactions: self.transactions(payload.transactions)?,
                }
            }
            _ => {
                debug!("Passing through unrecognized action kind {}", kind);
                Action::Unknown(kind.clone())
            }
        };
        Ok(action)
    }

    /// Check a block and normalize every hash it carries.
    ///
    /// # Arguments
    /// * `block` - Block as received from the source or a client
    ///
    /// # Returns
    /// The block with its own hash, its parent hash and every nested parcel
    /// normalized, or the first `MalformedEntityError` found
    pub fn block(&self, mut block: BlockDoc) -> Result<BlockDoc, MalformedEntityError> {
        block.hash = normalize_hash("block", "hash", &block.hash)?;

        // Genesis has no parent; an empty parent hash stays empty.
        if !block.parent_hash.is_empty() {
            block.parent_hash = normalize_hash("block", "parentHash", &block.parent_hash)?;
        }

        block.parcels = block
            .parcels
            .into_iter()
            .map(|parcel| self.parcel(parcel))
            .collect::<Result<_, _>>()?;
        Ok(block)
    }

    /// Check a parcel and normalize its hash and the hash of its block.
    ///
    /// An empty `blockHash` is read as a parcel not yet in a block.
    pub fn parcel(&self, mut parcel: ParcelDoc) -> Result<ParcelDoc, MalformedEntityError> {
        parcel.hash = normalize_hash("parcel", "hash", &parcel.hash)?;
        parcel.block_hash = match parcel.block_hash.take() {
            Some(hash) if !hash.is_empty() => Some(normalize_hash("parcel", "blockHash", &hash)?),
            _ => None,
        };
        Ok(parcel)
    }

    /// Check a tagged transaction; the key is `data.hash`, not a top-level field.
    pub fn transaction(&self, mut tx: TransactionDoc) -> Result<TransactionDoc, MalformedEntityError> {
        let hash = normalize_hash("transaction", "data.hash", tx.hash())?;
        *tx.hash_mut() = hash;
        Ok(tx)
    }

    /// Check a list of transactions.
    ///
    /// # Returns
    /// Every transaction normalized, or the error of the first bad entry.
    /// A single bad entry rejects the whole list.
    pub fn transactions(
        &self,
        transactions: Vec<TransactionDoc>,
    ) -> Result<Vec<TransactionDoc>, MalformedEntityError> {
        transactions
            .into_iter()
            .map(|tx| self.transaction(tx))
            .collect()
    }

    /// Normalize an asset type, which is keyed like a hash
    pub fn asset_type(&self, asset_type: &str) -> Result<String, MalformedEntityError> {
        normalize_hash("asset type", "assetType", asset_type)
    }

    /// Check an owned asset output; both its asset type and the hash of the
    /// transaction that created it are keys.
    pub fn asset(&self, mut asset: AssetDoc) -> Result<AssetDoc, MalformedEntityError> {
        asset.asset_type = normalize_hash("asset", "assetType", &asset.asset_type)?;
        asset.transaction_hash = normalize_hash("asset", "transactionHash", &asset.transaction_hash)?;
        Ok(asset)
    }

    /// Normalize a platform account id given as 20-byte hex
    pub fn account_id(&self, account_id: &str) -> Result<String, MalformedEntityError> {
        normalize_hex("account", "accountId", account_id, ACCOUNT_ID_HEX_LEN)
    }

    /// Normalize a hash taken from a URL or user input
    pub fn hash(&self, entity: &'static str, hash: &str) -> Result<String, MalformedEntityError> {
        normalize_hash(entity, "hash", hash)
    }
}

fn decode<T: DeserializeOwned>(entity: &'static str, data: Value) -> Result<T, MalformedEntityError> {
    serde_json::from_value(data).map_err(|e| {
        warn!("Rejecting malformed {}: {}", entity, e);
        MalformedEntityError::new(entity, e.to_string())
    })
}

/// Accepts 32-byte hex with or without `0x`, returns it lowercase and unprefixed.
fn normalize_hash(
    entity: &'static str,
    field: &str,
    raw: &str,
) -> Result<String, MalformedEntityError> {
    normalize_hex(entity, field, raw, HASH_HEX_LEN)
}

fn normalize_hex(
    entity: &'static str,
    field: &str,
    raw: &str,
    len: usize,
) -> Result<String, MalformedEntityError> {
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    if hex.is_empty() {
        return Err(MalformedEntityError::new(entity, format!("missing `{field}`")));
    }
    if hex.len() != len || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MalformedEntityError::new(
            entity,
            format!("`{field}` is not a {}-byte hex string: {raw}", len / 2),
        ));
    }
    Ok(hex.to_ascii_lowercase())
}
