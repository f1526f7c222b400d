//! The block store contract.

use crate::errors::StoreError;
use hl_book::Order;
use hl_ledger::Account;
use shared_types::{Address, Block, Certificate, CommittedTip, Hash, TradeRecord, View};

/// Persistent storage for consensus and committed application records.
///
/// Single-record puts and gets are atomic. `commit_atomically` groups the
/// records of one commit into an all-or-nothing batch.
pub trait BlockStore: Send + Sync {
    fn put_block(&self, block: &Block) -> Result<(), StoreError>;
    fn block(&self, hash: &Hash) -> Result<Option<Block>, StoreError>;

    fn put_certificate(&self, cert: &Certificate) -> Result<(), StoreError>;
    fn certificate_by_view(&self, view: View) -> Result<Option<Certificate>, StoreError>;

    fn set_committed_tip(&self, tip: &CommittedTip) -> Result<(), StoreError>;
    fn committed_tip(&self) -> Result<Option<CommittedTip>, StoreError>;

    /// Persist a commit in one atomic batch: the committed block, the
    /// certificate that finalized it, and the new tip.
    fn commit_atomically(
        &self,
        block: &Block,
        cert: &Certificate,
        tip: &CommittedTip,
    ) -> Result<(), StoreError>;

    fn put_account(&self, account: &Account) -> Result<(), StoreError>;
    fn account(&self, addr: &Address) -> Result<Option<Account>, StoreError>;

    fn put_order(&self, order: &Order) -> Result<(), StoreError>;
    fn delete_order(&self, owner: &Address, order_id: u64) -> Result<(), StoreError>;
    fn order(&self, owner: &Address, order_id: u64) -> Result<Option<Order>, StoreError>;

    fn put_trade(&self, trade: &TradeRecord) -> Result<(), StoreError>;
    /// Trades for a symbol in time order, up to `limit`.
    fn trades_by_symbol(&self, symbol: &str, limit: usize)
        -> Result<Vec<TradeRecord>, StoreError>;
}

impl<T: BlockStore + ?Sized> BlockStore for std::sync::Arc<T> {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        (**self).put_block(block)
    }
    fn block(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        (**self).block(hash)
    }
    fn put_certificate(&self, cert: &Certificate) -> Result<(), StoreError> {
        (**self).put_certificate(cert)
    }
    fn certificate_by_view(&self, view: View) -> Result<Option<Certificate>, StoreError> {
        (**self).certificate_by_view(view)
    }
    fn set_committed_tip(&self, tip: &CommittedTip) -> Result<(), StoreError> {
        (**self).set_committed_tip(tip)
    }
    fn committed_tip(&self) -> Result<Option<CommittedTip>, StoreError> {
        (**self).committed_tip()
    }
    fn commit_atomically(
        &self,
        block: &Block,
        cert: &Certificate,
        tip: &CommittedTip,
    ) -> Result<(), StoreError> {
        (**self).commit_atomically(block, cert, tip)
    }
    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        (**self).put_account(account)
    }
    fn account(&self, addr: &Address) -> Result<Option<Account>, StoreError> {
        (**self).account(addr)
    }
    fn put_order(&self, order: &Order) -> Result<(), StoreError> {
        (**self).put_order(order)
    }
    fn delete_order(&self, owner: &Address, order_id: u64) -> Result<(), StoreError> {
        (**self).delete_order(owner, order_id)
    }
    fn order(&self, owner: &Address, order_id: u64) -> Result<Option<Order>, StoreError> {
        (**self).order(owner, order_id)
    }
    fn put_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        (**self).put_trade(trade)
    }
    fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        (**self).trades_by_symbol(symbol, limit)
    }
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Encode(e.to_string()))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    key: &[u8],
    bytes: &[u8],
) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corrupt {
        key: hex_key(key),
        reason: e.to_string(),
    })
}

fn hex_key(key: &[u8]) -> String {
    key.iter().map(|b| format!("{b:02x}")).collect()
}
