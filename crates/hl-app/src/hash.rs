//! The application state hash.

use hl_book::OrderBook;
use sha2::{Digest, Sha256};
use shared_types::{Hash, Height};
use std::collections::BTreeMap;

/// `AppHash = H( H(height) || H(timestamp) || per symbol ascending:
/// symbol || bid levels (descending price: price || qty)
/// || ask levels (ascending price: price || qty) )`.
///
/// The symbol map is sorted and level queries return canonical best-first
/// order, so the digest is a pure function of the post-execution state
/// plus `(height, timestamp)`.
pub fn compute_app_hash(
    height: Height,
    timestamp: u64,
    books: &BTreeMap<String, OrderBook>,
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(sha256_of(&height.to_be_bytes()));
    hasher.update(sha256_of(&timestamp.to_be_bytes()));
    for (symbol, book) in books {
        hasher.update(symbol.as_bytes());
        for (price, qty) in book.bid_levels() {
            hasher.update(price.to_be_bytes());
            hasher.update(qty.to_be_bytes());
        }
        for (price, qty) in book.ask_levels() {
            hasher.update(price.to_be_bytes());
            hasher.update(qty.to_be_bytes());
        }
    }
    hasher.finalize().into()
}

fn sha256_of(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
