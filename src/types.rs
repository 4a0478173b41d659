//! Entity documents held by the explorer cache.
//!
//! These mirror the documents produced by the explorer's indexer: hashes and
//! asset types are lowercase hex without a `0x` prefix, field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A block as indexed by the explorer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDoc {
    pub number: u64,
    pub hash: String,
    #[serde(default)]
    pub parent_hash: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub parcels: Vec<ParcelDoc>,
}

impl BlockDoc {
    /// Hashes of every transaction carried by this block's parcels.
    pub fn transaction_hashes(&self) -> Vec<&str> {
        self.parcels
            .iter()
            .flat_map(|parcel| parcel.transaction_hashes())
            .collect()
    }
}

/// A parcel: the signed envelope that carries an action into a block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelDoc {
    pub hash: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub parcel_index: Option<u64>,
    /// Raw action payload, kept as the indexer delivered it.
    #[serde(default)]
    pub action: Value,
}

impl ParcelDoc {
    /// Transaction hashes found in a `changeShardState`-style action payload.
    pub fn transaction_hashes(&self) -> Vec<&str> {
        self.action
            .get("transactions")
            .and_then(Value::as_array)
            .map(|txs| {
                txs.iter()
                    .filter_map(|tx| tx.get("data")?.get("hash")?.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Asset scheme registered by a mint transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSchemeDoc {
    /// JSON-encoded metadata string, see [`AssetMetadata`]
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub registrar: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub network_id: String,
}

impl AssetSchemeDoc {
    pub fn parsed_metadata(&self) -> AssetMetadata {
        AssetMetadata::parse(&self.metadata)
    }
}

/// Human-facing fields decoded from an asset's metadata string.
///
/// Metadata is free-form; anything that is not a JSON object decodes to
/// all-`None` and the UI falls back to a generated icon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl AssetMetadata {
    pub fn parse(metadata: &str) -> Self {
        serde_json::from_str(metadata).unwrap_or_default()
    }
}

/// Balance and nonce of a platform account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDoc {
    pub balance: u64,
    pub nonce: u64,
}

/// Outcome of an applied transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDoc {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// One asset output as indexed by owner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDoc {
    pub asset_type: String,
    #[serde(default)]
    pub lock_script_hash: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub amount: u64,
    pub transaction_hash: String,
    #[serde(default)]
    pub transaction_output_index: u64,
}

/// An asset output together with the scheme of its asset type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBundleDoc {
    pub asset: AssetDoc,
    #[serde(default)]
    pub asset_scheme: Option<AssetSchemeDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMintOutput {
    pub asset_type: String,
    #[serde(default)]
    pub lock_script_hash: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMintTransactionData {
    pub hash: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub registrar: Option<String>,
    pub output: AssetMintOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetOutPoint {
    pub transaction_hash: String,
    #[serde(default)]
    pub index: u64,
    pub asset_type: String,
    #[serde(default)]
    pub amount: u64,
    /// Scheme of the spent asset, denormalized by the indexer
    #[serde(default)]
    pub asset_scheme: Option<AssetSchemeDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferInput {
    pub prev_out: AssetOutPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferOutput {
    #[serde(default)]
    pub lock_script_hash: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub asset_type: String,
    #[serde(default)]
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferTransactionData {
    pub hash: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub burns: Vec<AssetTransferInput>,
    #[serde(default)]
    pub inputs: Vec<AssetTransferInput>,
    #[serde(default)]
    pub outputs: Vec<AssetTransferOutput>,
}

/// Payload of a transaction kind the explorer does not model in detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherTransactionData {
    pub hash: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const ASSET_MINT: &str = "assetMint";
pub const ASSET_TRANSFER: &str = "assetTransfer";

/// A transaction document.
///
/// On the wire this is `{ "type": <kind>, "data": { "hash": .., .. } }`; the
/// hash lives one level down, under `data`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTransactionDoc")]
pub enum TransactionDoc {
    AssetMint(AssetMintTransactionData),
    AssetTransfer(AssetTransferTransactionData),
    Other {
        kind: String,
        data: OtherTransactionData,
    },
}

#[derive(Deserialize)]
struct RawTransactionDoc {
    #[serde(rename = "type")]
    kind: String,
    data: Value,
}

impl TryFrom<RawTransactionDoc> for TransactionDoc {
    type Error = serde_json::Error;

    fn try_from(raw: RawTransactionDoc) -> Result<Self, Self::Error> {
        let doc = if raw.kind == ASSET_MINT {
            TransactionDoc::AssetMint(serde_json::from_value(raw.data)?)
        } else if raw.kind == ASSET_TRANSFER {
            TransactionDoc::AssetTransfer(serde_json::from_value(raw.data)?)
        } else {
            TransactionDoc::Other {
                data: serde_json::from_value(raw.data)?,
                kind: raw.kind,
            }
        };
        Ok(doc)
    }
}

#[derive(Serialize)]
struct TaggedRef<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a T,
}

impl Serialize for TransactionDoc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TransactionDoc::AssetMint(data) => TaggedRef { kind: ASSET_MINT, data }.serialize(serializer),
            TransactionDoc::AssetTransfer(data) => {
                TaggedRef { kind: ASSET_TRANSFER, data }.serialize(serializer)
            }
            TransactionDoc::Other { kind, data } => TaggedRef {
                kind: kind.as_str(),
                data,
            }
            .serialize(serializer),
        }
    }
}

/// Asset column of a transaction listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub asset_type: String,
    pub amount: u64,
    pub icon_url: Option<String>,
}

impl TransactionDoc {
    pub fn kind(&self) -> &str {
        match self {
            TransactionDoc::AssetMint(_) => ASSET_MINT,
            TransactionDoc::AssetTransfer(_) => ASSET_TRANSFER,
            TransactionDoc::Other { kind, .. } => kind,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            TransactionDoc::AssetMint(data) => &data.hash,
            TransactionDoc::AssetTransfer(data) => &data.hash,
            TransactionDoc::Other { data, .. } => &data.hash,
        }
    }

    pub(crate) fn hash_mut(&mut self) -> &mut String {
        match self {
            TransactionDoc::AssetMint(data) => &mut data.hash,
            TransactionDoc::AssetTransfer(data) => &mut data.hash,
            TransactionDoc::Other { data, .. } => &mut data.hash,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            TransactionDoc::AssetMint(data) => data.timestamp,
            TransactionDoc::AssetTransfer(data) => data.timestamp,
            TransactionDoc::Other { data, .. } => data.timestamp,
        }
    }

    /// Asset type and amount moved by the transaction.
    ///
    /// Mints report their output; transfers report the first input's asset
    /// type and the sum of all input amounts, capped at `u64::MAX`.
    ///
    /// # Returns
    /// `None` for kinds that move no asset, or for a transfer without inputs
    pub fn asset_summary(&self) -> Option<AssetSummary> {
        match self {
            TransactionDoc::AssetMint(data) => Some(AssetSummary {
                asset_type: data.output.asset_type.clone(),
                amount: data.output.amount.unwrap_or(0),
                icon_url: AssetMetadata::parse(&data.metadata).icon_url,
            }),
            TransactionDoc::AssetTransfer(data) => {
                let first = data.inputs.first()?;
                Some(AssetSummary {
                    asset_type: first.prev_out.asset_type.clone(),
                    amount: data
                        .inputs
                        .iter()
                        .fold(0u64, |total, input| total.saturating_add(input.prev_out.amount)),
                    icon_url: first
                        .prev_out
                        .asset_scheme
                        .as_ref()
                        .and_then(|scheme| scheme.parsed_metadata().icon_url),
                })
            }
            TransactionDoc::Other { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mint_transaction_reads_hash_under_data() {
        let tx: TransactionDoc = serde_json::from_value(json!({
            "type": "assetMint",
            "data": {
                "hash": "aa",
                "timestamp": 1530000000,
                "metadata": "{\"name\":\"Gold\",\"icon_url\":\"https://example.com/gold.png\"}",
                "output": { "assetType": "53", "amount": 100 }
            }
        }))
        .unwrap();

        assert_eq!(tx.kind(), "assetMint");
        assert_eq!(tx.hash(), "aa");
        assert_eq!(tx.timestamp(), 1530000000);
        let summary = tx.asset_summary().unwrap();
        assert_eq!(summary.asset_type, "53");
        assert_eq!(summary.amount, 100);
        assert_eq!(summary.icon_url.as_deref(), Some("https://example.com/gold.png"));
    }

    #[test]
    fn test_transfer_summary_sums_inputs() {
        let tx: TransactionDoc = serde_json::from_value(json!({
            "type": "assetTransfer",
            "data": {
                "hash": "bb",
                "inputs": [
                    { "prevOut": { "transactionHash": "aa", "index": 0, "assetType": "53", "amount": 30,
                                   "assetScheme": { "metadata": "not json" } } },
                    { "prevOut": { "transactionHash": "aa", "index": 1, "assetType": "53", "amount": 12 } }
                ],
                "outputs": [ { "assetType": "53", "amount": 42 } ]
            }
        }))
        .unwrap();

        let summary = tx.asset_summary().unwrap();
        assert_eq!(summary.asset_type, "53");
        assert_eq!(summary.amount, 42);
        assert_eq!(summary.icon_url, None);
    }

    #[test]
    fn test_transfer_summary_saturates_instead_of_overflowing() {
        let tx: TransactionDoc = serde_json::from_value(json!({
            "type": "assetTransfer",
            "data": {
                "hash": "bb",
                "inputs": [
                    { "prevOut": { "transactionHash": "aa", "assetType": "53", "amount": 18446744073709551615u64 } },
                    { "prevOut": { "transactionHash": "aa", "index": 1, "assetType": "53", "amount": 1 } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(tx.asset_summary().unwrap().amount, u64::MAX);
    }

    #[test]
    fn test_unknown_kind_is_kept_with_extra_fields() {
        let value = json!({
            "type": "setRegularKey",
            "data": { "hash": "cc", "timestamp": 7, "key": "dd" }
        });
        let tx: TransactionDoc = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(tx.kind(), "setRegularKey");
        assert_eq!(tx.hash(), "cc");
        assert!(tx.asset_summary().is_none());
        assert_eq!(serde_json::to_value(&tx).unwrap(), value);
    }

    #[test]
    fn test_transaction_without_data_hash_is_rejected() {
        let result: Result<TransactionDoc, _> = serde_json::from_value(json!({
            "type": "assetMint",
            "data": { "timestamp": 1, "output": { "assetType": "53" } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_metadata_parse_tolerates_garbage() {
        assert_eq!(AssetMetadata::parse("plain text"), AssetMetadata::default());
        assert_eq!(
            AssetMetadata::parse("{\"name\":\"Silver\"}").name.as_deref(),
            Some("Silver")
        );
    }

    #[test]
    fn test_block_lists_transaction_hashes_from_parcels() {
        let block = BlockDoc {
            number: 3,
            hash: "ff".to_string(),
            parcels: vec![ParcelDoc {
                hash: "ee".to_string(),
                action: json!({
                    "action": "changeShardState",
                    "transactions": [ { "type": "assetMint", "data": { "hash": "aa" } } ]
                }),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(block.transaction_hashes(), vec!["aa"]);
    }
}
