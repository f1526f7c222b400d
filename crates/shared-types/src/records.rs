//! Persisted record shapes shared between execution and storage.

use crate::primitives::{Address, Hash, Height};
use serde::{Deserialize, Serialize};

/// The committed chain tip, persisted under a well-known key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTip {
    pub height: Height,
    pub block_hash: Hash,
    pub app_hash: Hash,
}

/// A settled trade, persisted under `(symbol, zero-padded timestamp,
/// trade_id)` for time-ordered range scans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub trade_id: u64,
    pub taker: Address,
    pub maker: Address,
    /// Execution price in ticks.
    pub price: u64,
    /// Quantity in lots.
    pub qty: u64,
    pub height: Height,
    /// Timestamp of the block that settled the trade.
    pub timestamp: u64,
}
