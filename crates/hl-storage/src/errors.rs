//! Store error types.

use thiserror::Error;

/// Block store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database I/O failure.
    #[error("store I/O error: {0}")]
    Io(String),

    /// A persisted record failed to decode.
    #[error("corrupt record under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Serialization of a record failed.
    #[error("record encoding failed: {0}")]
    Encode(String),
}
