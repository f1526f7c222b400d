//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, Keccak-256 | Block/app hashing, typed-data digests |
//! | `ecdsa` | secp256k1 (recoverable) | Client transaction signatures |
//! | `bls` | BLS12-381 (min-pk) | Consensus vote shares and aggregation |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, 65-byte `(r, s, v)`
//!   signatures recoverable to a 20-byte address
//! - **BLS12-381**: Ethereum 2.0 ciphersuite, aggregate verification over a
//!   common message

#![warn(clippy::all)]

pub mod bls;
pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use ecdsa::{recover_address, EcdsaKeyPair, RecoverableSignature};
pub use errors::CryptoError;
pub use hashing::{keccak256, sha256};
