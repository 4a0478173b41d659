use super::EntitySource;
use crate::{
    error::SourceError,
    types::{
        AccountDoc, AssetBundleDoc, AssetDoc, AssetSchemeDoc, BlockDoc, InvoiceDoc, ParcelDoc,
        TransactionDoc,
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory source used by the api and sync tests
#[derive(Default)]
pub(crate) struct FakeSource {
    pub best_block_number: Mutex<u64>,
    pub blocks: HashMap<String, BlockDoc>,
    pub parcels: HashMap<String, ParcelDoc>,
    pub transactions: HashMap<String, TransactionDoc>,
    pub asset_schemes: HashMap<String, AssetSchemeDoc>,
    pub asset_transactions: Mutex<HashMap<String, Vec<TransactionDoc>>>,
    pub invoices: HashMap<String, InvoiceDoc>,
    pub accounts: HashMap<String, AccountDoc>,
    pub account_blocks: HashMap<String, Vec<BlockDoc>>,
    pub account_parcels: HashMap<String, Vec<ParcelDoc>>,
    pub account_asset_bundles: HashMap<String, Vec<AssetBundleDoc>>,
    pub pubkey_assets: HashMap<String, Vec<AssetDoc>>,
    pub pubkey_transactions: HashMap<String, Vec<TransactionDoc>>,
    /// `(transaction hash, output index)` of spent outputs
    pub spent: HashSet<(String, u64)>,
    pub offline: AtomicBool,
    pub failing_blocks: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_block(mut self, block: BlockDoc) -> Self {
        self.blocks.insert(block.hash.clone(), block);
        self
    }

    pub fn with_parcel(mut self, parcel: ParcelDoc) -> Self {
        self.parcels.insert(parcel.hash.clone(), parcel);
        self
    }

    pub fn with_transaction(mut self, tx: TransactionDoc) -> Self {
        self.transactions.insert(tx.hash().to_string(), tx);
        self
    }

    pub fn with_asset(
        mut self,
        asset_type: &str,
        scheme: AssetSchemeDoc,
        transactions: Vec<TransactionDoc>,
    ) -> Self {
        self.asset_schemes.insert(asset_type.to_string(), scheme);
        self.asset_transactions
            .get_mut()
            .unwrap()
            .insert(asset_type.to_string(), transactions);
        self
    }

    pub fn with_invoice(mut self, hash: &str, invoice: InvoiceDoc) -> Self {
        self.invoices.insert(hash.to_string(), invoice);
        self
    }

    pub fn with_account(mut self, account_id: &str, account: AccountDoc) -> Self {
        self.accounts.insert(account_id.to_string(), account);
        self
    }

    pub fn with_account_history(
        mut self,
        account_id: &str,
        blocks: Vec<BlockDoc>,
        parcels: Vec<ParcelDoc>,
        asset_bundles: Vec<AssetBundleDoc>,
    ) -> Self {
        self.account_blocks.insert(account_id.to_string(), blocks);
        self.account_parcels.insert(account_id.to_string(), parcels);
        self.account_asset_bundles
            .insert(account_id.to_string(), asset_bundles);
        self
    }

    pub fn with_pubkey_history(
        mut self,
        pubkey: &str,
        assets: Vec<AssetDoc>,
        transactions: Vec<TransactionDoc>,
    ) -> Self {
        self.pubkey_assets.insert(pubkey.to_string(), assets);
        self.pubkey_transactions
            .insert(pubkey.to_string(), transactions);
        self
    }

    pub fn with_spent(mut self, hash: &str, index: u64) -> Self {
        self.spent.insert((hash.to_string(), index));
        self
    }

    /// Index one more transaction under `asset_type`, as the indexer would
    /// after a new block.
    pub fn push_asset_transaction(&self, asset_type: &str, tx: TransactionDoc) {
        self.asset_transactions
            .lock()
            .unwrap()
            .entry(asset_type.to_string())
            .or_default()
            .push(tx);
    }

    pub fn set_best_block_number(&self, number: u64) {
        *self.best_block_number.lock().unwrap() = number;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `block` lookups fail while every other call still succeeds.
    pub fn set_failing_blocks(&self, failing: bool) {
        self.failing_blocks.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("fake source offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitySource for FakeSource {
    async fn ping(&self) -> Result<String, SourceError> {
        self.enter()?;
        Ok("pong".to_string())
    }

    async fn best_block_number(&self) -> Result<u64, SourceError> {
        self.enter()?;
        Ok(*self.best_block_number.lock().unwrap())
    }

    async fn block_hash(&self, number: u64) -> Result<Option<String>, SourceError> {
        self.enter()?;
        Ok(self
            .blocks
            .values()
            .find(|block| block.number == number)
            .map(|block| format!("0x{}", block.hash)))
    }

    async fn block(&self, hash: &str) -> Result<Option<BlockDoc>, SourceError> {
        self.enter()?;
        if self.failing_blocks.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("block lookup failed".to_string()));
        }
        Ok(self.blocks.get(hash).cloned())
    }

    async fn parcel(&self, hash: &str) -> Result<Option<ParcelDoc>, SourceError> {
        self.enter()?;
        Ok(self.parcels.get(hash).cloned())
    }

    async fn transaction(&self, hash: &str) -> Result<Option<TransactionDoc>, SourceError> {
        self.enter()?;
        Ok(self.transactions.get(hash).cloned())
    }

    async fn asset_scheme(&self, asset_type: &str) -> Result<Option<AssetSchemeDoc>, SourceError> {
        self.enter()?;
        Ok(self.asset_schemes.get(asset_type).cloned())
    }

    async fn asset_transactions(&self, asset_type: &str) -> Result<Vec<TransactionDoc>, SourceError> {
        self.enter()?;
        Ok(self
            .asset_transactions
            .lock()
            .unwrap()
            .get(asset_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn transaction_invoice(&self, hash: &str) -> Result<Option<InvoiceDoc>, SourceError> {
        self.enter()?;
        Ok(self.invoices.get(hash).cloned())
    }

    async fn balance(&self, account_id: &str) -> Result<u64, SourceError> {
        self.enter()?;
        Ok(self.accounts.get(account_id).map_or(0, |account| account.balance))
    }

    async fn nonce(&self, account_id: &str) -> Result<u64, SourceError> {
        self.enter()?;
        Ok(self.accounts.get(account_id).map_or(0, |account| account.nonce))
    }

    async fn blocks_by_account(&self, account_id: &str) -> Result<Vec<BlockDoc>, SourceError> {
        self.enter()?;
        Ok(self.account_blocks.get(account_id).cloned().unwrap_or_default())
    }

    async fn parcels_by_account(&self, account_id: &str) -> Result<Vec<ParcelDoc>, SourceError> {
        self.enter()?;
        Ok(self.account_parcels.get(account_id).cloned().unwrap_or_default())
    }

    async fn asset_bundles_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<AssetBundleDoc>, SourceError> {
        self.enter()?;
        Ok(self
            .account_asset_bundles
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn assets_by_pubkey(&self, pubkey: &str) -> Result<Vec<AssetDoc>, SourceError> {
        self.enter()?;
        Ok(self.pubkey_assets.get(pubkey).cloned().unwrap_or_default())
    }

    async fn is_asset_unspent(&self, hash: &str, index: u64) -> Result<bool, SourceError> {
        self.enter()?;
        Ok(!self.spent.contains(&(hash.to_string(), index)))
    }

    async fn transactions_by_pubkey(&self, pubkey: &str) -> Result<Vec<TransactionDoc>, SourceError> {
        self.enter()?;
        Ok(self
            .pubkey_transactions
            .get(pubkey)
            .cloned()
            .unwrap_or_default())
    }
}
