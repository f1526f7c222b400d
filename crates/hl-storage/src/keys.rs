//! Key layout.
//!
//! Column families separate the record classes; within the `app` family a
//! short prefix namespaces each record kind. Trade keys embed a
//! zero-padded timestamp so that a prefix scan walks trades in time
//! order.

use shared_types::{Address, Hash, View};

/// Column family for blocks keyed by hash.
pub const CF_BLOCKS: &str = "blocks";
/// Column family for certificates keyed by view.
pub const CF_CERTS: &str = "certs";
/// Column family for application records.
pub const CF_APP: &str = "app";
/// Column family for chain metadata.
pub const CF_METADATA: &str = "metadata";

/// All column families used by the node.
pub const COLUMN_FAMILIES: &[&str] = &[CF_BLOCKS, CF_CERTS, CF_APP, CF_METADATA];

/// Well-known metadata key for the committed tip.
pub const COMMITTED_TIP_KEY: &[u8] = b"committed_tip";

pub fn block_key(hash: &Hash) -> Vec<u8> {
    hash.to_vec()
}

pub fn cert_key(view: View) -> Vec<u8> {
    view.to_be_bytes().to_vec()
}

pub fn account_key(addr: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(5 + 20);
    key.extend_from_slice(b"acct:");
    key.extend_from_slice(&addr.0);
    key
}

pub fn order_key(owner: &Address, order_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + 20 + 8);
    key.extend_from_slice(b"ord:");
    key.extend_from_slice(&owner.0);
    key.extend_from_slice(&order_id.to_be_bytes());
    key
}

pub fn trade_prefix(symbol: &str) -> Vec<u8> {
    format!("trd:{symbol}:").into_bytes()
}

pub fn trade_key(symbol: &str, timestamp: u64, trade_id: u64) -> Vec<u8> {
    let mut key = format!("trd:{symbol}:{timestamp:020}:").into_bytes();
    key.extend_from_slice(&trade_id.to_be_bytes());
    key
}
