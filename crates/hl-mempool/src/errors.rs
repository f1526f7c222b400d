//! Mempool error types.

use thiserror::Error;

/// Mempool error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Pool has reached maximum capacity.
    #[error("mempool full (capacity {capacity})")]
    PoolFull { capacity: usize },

    /// Transaction exceeds the single-transaction size limit.
    #[error("transaction of {size} bytes exceeds limit {max}")]
    TransactionTooLarge { size: usize, max: usize },
}
