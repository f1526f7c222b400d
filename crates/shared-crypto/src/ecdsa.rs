//! # ECDSA Signatures (secp256k1)
//!
//! Recoverable secp256k1 signatures over 32-byte digests, Ethereum style:
//! the 65-byte wire form is `r || s || v` with `v ∈ {27, 28}`, and the
//! signer's 20-byte address is recovered from the digest and signature
//! rather than transmitted.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization
//! - Addresses derived as `keccak256(uncompressed_pubkey)[12..]`

use crate::errors::CryptoError;
use crate::hashing::keccak256;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::{Address, Hash};
use zeroize::Zeroize;

/// A 65-byte recoverable signature in `r || s || v` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    /// Parse from a byte slice, enforcing the 65-byte length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 65 {
            return Err(CryptoError::InvalidSignatureLength {
                expected: 65,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; 65];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    fn split(&self) -> Result<(Signature, RecoveryId), CryptoError> {
        let sig = Signature::from_slice(&self.0[..64])
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        let v = self.0[64];
        // Accept both the raw parity byte and the Ethereum +27 offset.
        let parity = match v {
            0 | 1 => v,
            27 | 28 => v - 27,
            other => return Err(CryptoError::InvalidRecoveryId(other)),
        };
        let recid =
            RecoveryId::from_byte(parity).ok_or(CryptoError::InvalidRecoveryId(v))?;
        Ok((sig, recid))
    }
}

/// secp256k1 keypair for signing typed-data digests.
pub struct EcdsaKeyPair {
    signing_key: SigningKey,
}

impl EcdsaKeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let mut bytes = bytes;
        bytes.zeroize();
        Ok(Self { signing_key })
    }

    /// Sign a 32-byte digest, producing the 65-byte recoverable form with
    /// `v ∈ {27, 28}`.
    pub fn sign_digest(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recid.to_byte() + 27;
        Ok(RecoverableSignature(out))
    }

    /// The address this keypair signs as.
    pub fn address(&self) -> Address {
        verifying_key_to_address(self.signing_key.verifying_key())
    }
}

/// Recover the signer address from a digest and a 65-byte signature.
pub fn recover_address(
    digest: &Hash,
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    let (sig, recid) = signature.split()?;
    let vk = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    Ok(verifying_key_to_address(&vk))
}

fn verifying_key_to_address(vk: &VerifyingKey) -> Address {
    let point = vk.to_encoded_point(false);
    // Uncompressed SEC1 is 0x04 || x || y; the address hashes only x || y.
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Address(addr)
}
