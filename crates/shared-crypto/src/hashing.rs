//! SHA-256 and Keccak-256 one-shot hashing.
//!
//! SHA-256 is the consensus hash: block hashes, app hashes and vote
//! messages all use it. Keccak-256 exists solely for the client-side
//! typed-data digests and address derivation, which follow Ethereum
//! conventions.

use sha2::{Digest, Sha256};
use sha3::Keccak256;
use shared_types::Hash;

/// One-shot SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// One-shot Keccak-256.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}
