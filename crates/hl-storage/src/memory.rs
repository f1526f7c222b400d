//! In-memory store adapter for tests and the network simulator.

use crate::errors::StoreError;
use crate::keys;
use crate::store::{decode, encode, BlockStore};
use hl_book::Order;
use hl_ledger::Account;
use parking_lot::RwLock;
use shared_types::{Address, Block, Certificate, CommittedTip, Hash, TradeRecord, View};
use std::collections::BTreeMap;

/// A `BlockStore` over sorted in-memory maps. Values are stored in their
/// encoded form so the adapter round-trips records exactly like the
/// RocksDB adapter does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    certs: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    app: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    metadata: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        let bytes = encode(block)?;
        self.blocks
            .write()
            .insert(keys::block_key(&block.hash()), bytes);
        Ok(())
    }

    fn block(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        let key = keys::block_key(hash);
        self.blocks
            .read()
            .get(&key)
            .map(|bytes| decode(&key, bytes))
            .transpose()
    }

    fn put_certificate(&self, cert: &Certificate) -> Result<(), StoreError> {
        let bytes = encode(cert)?;
        self.certs.write().insert(keys::cert_key(cert.view), bytes);
        Ok(())
    }

    fn certificate_by_view(&self, view: View) -> Result<Option<Certificate>, StoreError> {
        let key = keys::cert_key(view);
        self.certs
            .read()
            .get(&key)
            .map(|bytes| decode(&key, bytes))
            .transpose()
    }

    fn set_committed_tip(&self, tip: &CommittedTip) -> Result<(), StoreError> {
        let bytes = encode(tip)?;
        self.metadata
            .write()
            .insert(keys::COMMITTED_TIP_KEY.to_vec(), bytes);
        Ok(())
    }

    fn committed_tip(&self) -> Result<Option<CommittedTip>, StoreError> {
        self.metadata
            .read()
            .get(keys::COMMITTED_TIP_KEY)
            .map(|bytes| decode(keys::COMMITTED_TIP_KEY, bytes))
            .transpose()
    }

    fn commit_atomically(
        &self,
        block: &Block,
        cert: &Certificate,
        tip: &CommittedTip,
    ) -> Result<(), StoreError> {
        // Encode everything first so a failure leaves no partial write.
        let block_bytes = encode(block)?;
        let cert_bytes = encode(cert)?;
        let tip_bytes = encode(tip)?;
        let mut blocks = self.blocks.write();
        let mut certs = self.certs.write();
        let mut metadata = self.metadata.write();
        blocks.insert(keys::block_key(&block.hash()), block_bytes);
        certs.insert(keys::cert_key(cert.view), cert_bytes);
        metadata.insert(keys::COMMITTED_TIP_KEY.to_vec(), tip_bytes);
        Ok(())
    }

    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        let bytes = encode(account)?;
        self.app
            .write()
            .insert(keys::account_key(&account.address), bytes);
        Ok(())
    }

    fn account(&self, addr: &Address) -> Result<Option<Account>, StoreError> {
        let key = keys::account_key(addr);
        self.app
            .read()
            .get(&key)
            .map(|bytes| decode(&key, bytes))
            .transpose()
    }

    fn put_order(&self, order: &Order) -> Result<(), StoreError> {
        let bytes = encode(order)?;
        self.app
            .write()
            .insert(keys::order_key(&order.owner, order.id), bytes);
        Ok(())
    }

    fn delete_order(&self, owner: &Address, order_id: u64) -> Result<(), StoreError> {
        self.app.write().remove(&keys::order_key(owner, order_id));
        Ok(())
    }

    fn order(&self, owner: &Address, order_id: u64) -> Result<Option<Order>, StoreError> {
        let key = keys::order_key(owner, order_id);
        self.app
            .read()
            .get(&key)
            .map(|bytes| decode(&key, bytes))
            .transpose()
    }

    fn put_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        let bytes = encode(trade)?;
        self.app.write().insert(
            keys::trade_key(&trade.symbol, trade.timestamp, trade.trade_id),
            bytes,
        );
        Ok(())
    }

    fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let prefix = keys::trade_prefix(symbol);
        let app = self.app.read();
        app.range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .take(limit)
            .map(|(k, v)| decode(k, v))
            .collect()
    }
}
