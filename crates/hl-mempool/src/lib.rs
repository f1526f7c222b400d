//! # Mempool - Three-Bucket Priority Queue
//!
//! Pending transactions wait in one of three FIFO buckets, classified by
//! the envelope's `type` discriminator:
//!
//! - **non-order**: anything that is neither an order nor a cancel
//!   (administrative transaction kinds drain first)
//! - **cancel**: cancel envelopes
//! - **order**: order envelopes, and the graceful default for unknown or
//!   malformed payloads (execution will reject those later)
//!
//! Proposal selection drains the buckets in that fixed order under a byte
//! budget. A single mutex guards all three queues; fine-grained locking
//! offers no win at current volumes.

mod errors;

pub use errors::MempoolError;

use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::trace;

/// Priority bucket of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    NonOrder,
    Cancel,
    Order,
}

/// Mempool limits.
#[derive(Clone, Copy, Debug)]
pub struct MempoolConfig {
    /// Maximum transactions held across all buckets.
    pub capacity: usize,
    /// Maximum size of a single transaction in bytes.
    pub max_tx_bytes: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            max_tx_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Default)]
struct Buckets {
    non_order: VecDeque<Vec<u8>>,
    cancel: VecDeque<Vec<u8>>,
    order: VecDeque<Vec<u8>>,
}

impl Buckets {
    fn len(&self) -> usize {
        self.non_order.len() + self.cancel.len() + self.order.len()
    }
}

/// The shared mempool.
#[derive(Debug, Default)]
pub struct Mempool {
    config: MempoolConfig,
    buckets: Mutex<Buckets>,
}

impl Mempool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MempoolConfig::default())
    }

    /// Classify a raw envelope by its `type` field.
    ///
    /// Unknown or malformed payloads land in the order bucket; execution
    /// is the authority that finally rejects them.
    pub fn classify(raw: &[u8]) -> Bucket {
        match serde_json::from_slice::<serde_json::Value>(raw) {
            Ok(value) => match value.get("type").and_then(|t| t.as_str()) {
                Some("order") => Bucket::Order,
                Some("cancel") => Bucket::Cancel,
                Some(_) => Bucket::NonOrder,
                None => Bucket::Order,
            },
            Err(_) => Bucket::Order,
        }
    }

    /// Copy the bytes into the appropriate bucket.
    pub fn push(&self, raw: &[u8]) -> Result<Bucket, MempoolError> {
        if raw.len() > self.config.max_tx_bytes {
            return Err(MempoolError::TransactionTooLarge {
                size: raw.len(),
                max: self.config.max_tx_bytes,
            });
        }
        let bucket = Self::classify(raw);
        let mut buckets = self.buckets.lock();
        if buckets.len() >= self.config.capacity {
            return Err(MempoolError::PoolFull {
                capacity: self.config.capacity,
            });
        }
        let queue = match bucket {
            Bucket::NonOrder => &mut buckets.non_order,
            Bucket::Cancel => &mut buckets.cancel,
            Bucket::Order => &mut buckets.order,
        };
        queue.push_back(raw.to_vec());
        trace!(bucket = ?bucket, bytes = raw.len(), "mempool push");
        Ok(bucket)
    }

    /// Drain transactions for a proposal, in fixed priority order
    /// (non-order, cancel, order), stopping as soon as the next item
    /// would exceed `max_bytes`. Residue stays queued for the next
    /// proposal.
    pub fn select_for_proposal(&self, max_bytes: usize) -> Vec<Vec<u8>> {
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        let mut selected = Vec::new();
        let mut budget = max_bytes;
        for queue in [
            &mut buckets.non_order,
            &mut buckets.cancel,
            &mut buckets.order,
        ] {
            loop {
                match queue.front() {
                    Some(tx) if tx.len() <= budget => {
                        budget -= tx.len();
                        selected.push(queue.pop_front().expect("front just observed"));
                    }
                    _ => break,
                }
            }
        }
        selected
    }

    /// Total queued transactions.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-bucket depths `(non_order, cancel, order)`.
    pub fn depths(&self) -> (usize, usize, usize) {
        let buckets = self.buckets.lock();
        (
            buckets.non_order.len(),
            buckets.cancel.len(),
            buckets.order.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_type_field() {
        assert_eq!(Mempool::classify(br#"{"type":"order"}"#), Bucket::Order);
        assert_eq!(Mempool::classify(br#"{"type":"cancel"}"#), Bucket::Cancel);
        assert_eq!(Mempool::classify(br#"{"type":"deposit"}"#), Bucket::NonOrder);
        // Graceful defaults.
        assert_eq!(Mempool::classify(br#"{"no_type":1}"#), Bucket::Order);
        assert_eq!(Mempool::classify(b"not json at all"), Bucket::Order);
    }

    #[test]
    fn selection_order_is_non_order_cancel_order() {
        let pool = Mempool::with_defaults();
        pool.push(br#"{"type":"order","n":1}"#).unwrap();
        pool.push(br#"{"type":"cancel","n":2}"#).unwrap();
        pool.push(br#"{"type":"deposit","n":3}"#).unwrap();
        pool.push(br#"{"type":"order","n":4}"#).unwrap();

        let selected = pool.select_for_proposal(1 << 20);
        let kinds: Vec<Bucket> = selected.iter().map(|tx| Mempool::classify(tx)).collect();
        assert_eq!(
            kinds,
            vec![Bucket::NonOrder, Bucket::Cancel, Bucket::Order, Bucket::Order]
        );
        // FIFO within the order bucket.
        assert!(selected[2].ends_with(br#""n":1}"#));
        assert!(selected[3].ends_with(br#""n":4}"#));
        assert!(pool.is_empty());
    }

    #[test]
    fn byte_budget_stops_selection_and_keeps_residue() {
        let pool = Mempool::with_defaults();
        let tx1 = br#"{"type":"order","n":1}"#;
        let tx2 = br#"{"type":"order","n":2}"#;
        pool.push(tx1).unwrap();
        pool.push(tx2).unwrap();

        let selected = pool.select_for_proposal(tx1.len());
        assert_eq!(selected.len(), 1);
        assert_eq!(pool.len(), 1);

        // Residue drains on the next proposal.
        let rest = pool.select_for_proposal(1 << 20);
        assert_eq!(rest.len(), 1);
        assert!(rest[0].ends_with(br#""n":2}"#));
    }

    #[test]
    fn capacity_and_size_limits() {
        let pool = Mempool::new(MempoolConfig {
            capacity: 1,
            max_tx_bytes: 16,
        });
        assert!(matches!(
            pool.push(&[0u8; 17]),
            Err(MempoolError::TransactionTooLarge { .. })
        ));
        pool.push(br#"{"a":1}"#).unwrap();
        assert!(matches!(
            pool.push(br#"{"b":2}"#),
            Err(MempoolError::PoolFull { capacity: 1 })
        ));
    }
}
