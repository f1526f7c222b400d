//! # RocksDB Store Adapter
//!
//! Production `BlockStore` implementation.
//!
//! ## Features
//!
//! - Atomic batch writes (WriteBatch) for commits
//! - Column families separating blocks, certificates, app records and
//!   metadata
//! - Snappy compression
//! - Bloom filters for read optimization

use crate::errors::StoreError;
use crate::keys::{self, CF_APP, CF_BLOCKS, CF_CERTS, CF_METADATA, COLUMN_FAMILIES};
use crate::store::{decode, encode, BlockStore};
use hl_book::Order;
use hl_ledger::Account;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use shared_types::{Address, Block, Certificate, CommittedTip, Hash, TradeRecord, View};
use tracing::info;

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory.
    pub path: String,
    /// Block cache size in bytes (default: 256MB).
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB).
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability).
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".to_string(),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Config for testing: small buffers, no fsync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed block store.
pub struct RocksDbStore {
    db: DB,
    write_opts: rocksdb::WriteOptions,
}

impl RocksDbStore {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| StoreError::Io(format!("failed to open RocksDB: {e}")))?;

        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(config.sync_writes);

        info!(path = %config.path, "block store opened");
        Ok(Self { db, write_opts })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Io(format!("missing column family {name}")))
    }

    fn put(&self, cf_name: &str, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf_opt(cf, key, value, &self.write_opts)
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(cf, key)
            .map_err(|e| StoreError::Io(e.to_string()))?
            .map(|bytes| decode(key, &bytes))
            .transpose()
    }
}

impl BlockStore for RocksDbStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        self.put(CF_BLOCKS, &keys::block_key(&block.hash()), encode(block)?)
    }

    fn block(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        self.get(CF_BLOCKS, &keys::block_key(hash))
    }

    fn put_certificate(&self, cert: &Certificate) -> Result<(), StoreError> {
        self.put(CF_CERTS, &keys::cert_key(cert.view), encode(cert)?)
    }

    fn certificate_by_view(&self, view: View) -> Result<Option<Certificate>, StoreError> {
        self.get(CF_CERTS, &keys::cert_key(view))
    }

    fn set_committed_tip(&self, tip: &CommittedTip) -> Result<(), StoreError> {
        self.put(CF_METADATA, keys::COMMITTED_TIP_KEY, encode(tip)?)
    }

    fn committed_tip(&self) -> Result<Option<CommittedTip>, StoreError> {
        self.get(CF_METADATA, keys::COMMITTED_TIP_KEY)
    }

    fn commit_atomically(
        &self,
        block: &Block,
        cert: &Certificate,
        tip: &CommittedTip,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_BLOCKS)?, keys::block_key(&block.hash()), encode(block)?);
        batch.put_cf(self.cf(CF_CERTS)?, keys::cert_key(cert.view), encode(cert)?);
        batch.put_cf(self.cf(CF_METADATA)?, keys::COMMITTED_TIP_KEY, encode(tip)?);
        self.db
            .write_opt(batch, &self.write_opts)
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        self.put(CF_APP, &keys::account_key(&account.address), encode(account)?)
    }

    fn account(&self, addr: &Address) -> Result<Option<Account>, StoreError> {
        self.get(CF_APP, &keys::account_key(addr))
    }

    fn put_order(&self, order: &Order) -> Result<(), StoreError> {
        self.put(CF_APP, &keys::order_key(&order.owner, order.id), encode(order)?)
    }

    fn delete_order(&self, owner: &Address, order_id: u64) -> Result<(), StoreError> {
        let cf = self.cf(CF_APP)?;
        self.db
            .delete_cf_opt(cf, keys::order_key(owner, order_id), &self.write_opts)
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn order(&self, owner: &Address, order_id: u64) -> Result<Option<Order>, StoreError> {
        self.get(CF_APP, &keys::order_key(owner, order_id))
    }

    fn put_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        self.put(
            CF_APP,
            &keys::trade_key(&trade.symbol, trade.timestamp, trade.trade_id),
            encode(trade)?,
        )
    }

    fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let cf = self.cf(CF_APP)?;
        let prefix = keys::trade_prefix(symbol);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        let mut trades = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Io(e.to_string()))?;
            if !key.starts_with(&prefix) || trades.len() >= limit {
                break;
            }
            trades.push(decode(&key, &value)?);
        }
        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RocksDbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            RocksDbStore::open(RocksDbConfig::for_testing(dir.path().display().to_string()))
                .unwrap();
        (dir, store)
    }

    #[test]
    fn blocks_survive_round_trip() {
        let (_dir, store) = open_temp();
        let block = Block {
            height: 5,
            view: 6,
            parent_hash: [7u8; 32],
            payload: vec![b"tx-a".to_vec(), b"tx-b".to_vec()],
            proposer: "val-1".into(),
            timestamp: 99,
        };
        store.put_block(&block).unwrap();
        assert_eq!(store.block(&block.hash()).unwrap(), Some(block));
    }

    #[test]
    fn atomic_commit_writes_all_three_records() {
        let (_dir, store) = open_temp();
        let block = Block {
            height: 1,
            view: 1,
            parent_hash: [0u8; 32],
            payload: Vec::new(),
            proposer: "val-1".into(),
            timestamp: 1,
        };
        let cert = Certificate {
            view: 1,
            block_hash: block.hash(),
            app_hash: [3u8; 32],
            agg_signature: vec![0u8; 96],
            signers: vec!["val-1".into(), "val-2".into(), "val-3".into()],
        };
        let tip = CommittedTip {
            height: 1,
            block_hash: block.hash(),
            app_hash: [3u8; 32],
        };
        store.commit_atomically(&block, &cert, &tip).unwrap();

        assert_eq!(store.block(&block.hash()).unwrap(), Some(block));
        assert_eq!(store.certificate_by_view(1).unwrap(), Some(cert));
        assert_eq!(store.committed_tip().unwrap(), Some(tip));
    }

    #[test]
    fn orders_and_accounts_round_trip() {
        let (_dir, store) = open_temp();
        let owner = Address([5; 20]);
        let order = Order {
            id: 11,
            symbol: "HYPL-USDC".into(),
            side: hl_book::Side::Buy,
            price: 50_000,
            qty: 40,
            order_type: hl_book::OrderType::Gtc,
            owner,
        };
        store.put_order(&order).unwrap();
        assert_eq!(store.order(&owner, 11).unwrap(), Some(order));
        store.delete_order(&owner, 11).unwrap();
        assert_eq!(store.order(&owner, 11).unwrap(), None);

        let account = Account::new(owner);
        store.put_account(&account).unwrap();
        assert_eq!(store.account(&owner).unwrap(), Some(account));
    }
}
