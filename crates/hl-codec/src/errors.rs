//! Codec error types.

use thiserror::Error;

/// Signed-transaction codec error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Envelope is not well-formed (bad JSON, unknown discriminator,
    /// missing fields, out-of-range enum values, bad address).
    #[error("invalid envelope format: {0}")]
    InvalidFormat(String),

    /// A decimal-string integer field failed to parse or overflowed.
    #[error("bad number in field {field}: {value:?}")]
    BadNumber { field: &'static str, value: String },

    /// Signature is not exactly 65 bytes.
    #[error("bad signature length: expected {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },

    /// Signature does not recover to the declared owner.
    #[error("signature does not match owner")]
    InvalidSignature,

    /// Transaction deadline has passed relative to the block timestamp.
    #[error("transaction expired: deadline {deadline} < block time {now}")]
    Expired { deadline: u64, now: u64 },

    /// No delegation registered under the id.
    #[error("unknown delegation: {0}")]
    UnknownDelegation(String),

    /// Delegation expiry has passed.
    #[error("delegation expired")]
    ExpiredDelegation,

    /// Delegation signature does not recover to the wallet.
    #[error("delegation signature invalid")]
    DelegationSignatureInvalid,
}
