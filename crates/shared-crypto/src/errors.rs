//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("invalid signature format")]
    InvalidSignatureFormat,

    /// Signature length is not the expected 65 bytes
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    /// Invalid recovery id (must be 0/1, offset by 27)
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Invalid public key
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Invalid signature
    #[error("invalid signature")]
    InvalidSignature,

    /// BLS aggregation failed
    #[error("BLS aggregation failed")]
    AggregationFailed,

    /// Empty input where at least one element is required
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
