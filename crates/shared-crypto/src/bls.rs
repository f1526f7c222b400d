//! BLS12-381 Signature Implementation
//!
//! Provides BLS signature primitives for:
//! - Key generation
//! - Sign/verify operations
//! - Signature share aggregation and aggregate verification
//!
//! Used by the consensus engine for vote shares: every validator signs the
//! same 32-byte block hash, the leader aggregates the agreeing shares into
//! one signature, and replicas verify the aggregate against the signer
//! subset of the validator key set.

use blst::min_pk::{AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;

use crate::CryptoError;

/// Domain separation tag for BLS signatures (Ethereum 2.0 compatible)
const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// BLS public key (48 bytes compressed)
#[derive(Clone, Debug)]
pub struct BlsPublicKey(PublicKey);

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

/// BLS signature (96 bytes compressed)
#[derive(Clone, Debug)]
pub struct BlsSignature(Signature);

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

/// BLS key pair for signing operations
pub struct BlsKeyPair {
    secret: SecretKey,
    public: BlsPublicKey,
}

impl BlsKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let mut ikm = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        let secret = SecretKey::key_gen(&ikm, &[]).expect("valid IKM");
        let public = BlsPublicKey(secret.sk_to_pk());
        Self { secret, public }
    }

    /// Create from existing secret key bytes
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Deterministic key pair from a seed. Test and bootstrap helper; the
    /// seed is fed to the IKM-based key generation as-is.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let secret = SecretKey::key_gen(seed, &[]).expect("valid IKM");
        let public = BlsPublicKey(secret.sk_to_pk());
        Self { secret, public }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature(self.secret.sign(message, DST, &[]))
    }

    /// Get the public key
    pub fn public_key(&self) -> BlsPublicKey {
        self.public.clone()
    }

    /// Get the secret key bytes
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

impl BlsPublicKey {
    /// Verify a signature against this public key
    pub fn verify(&self, message: &[u8], signature: &BlsSignature) -> bool {
        signature.0.verify(true, message, DST, &[], &self.0, true) == BLST_ERROR::BLST_SUCCESS
    }

    /// Create from 48-byte compressed representation
    pub fn from_bytes(bytes: &[u8; 48]) -> Result<Self, CryptoError> {
        PublicKey::from_bytes(bytes)
            .map(BlsPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Serialize to 48-byte compressed form
    pub fn to_bytes(&self) -> [u8; 48] {
        self.0.to_bytes()
    }
}

impl BlsSignature {
    /// Create from 96-byte representation
    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self, CryptoError> {
        Signature::from_bytes(bytes)
            .map(BlsSignature)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Create from a byte slice, enforcing the 96-byte length
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 96] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        Self::from_bytes(&arr)
    }

    /// Serialize to 96-byte form
    pub fn to_bytes(&self) -> [u8; 96] {
        self.0.to_bytes()
    }

    /// Aggregate multiple signature shares into one.
    ///
    /// All shares must sign the SAME message for the aggregate to verify
    /// via [`BlsSignature::verify_aggregate`].
    pub fn aggregate(sigs: &[BlsSignature]) -> Result<Self, CryptoError> {
        if sigs.is_empty() {
            return Err(CryptoError::InvalidInput("empty signature list".into()));
        }
        let refs: Vec<&Signature> = sigs.iter().map(|s| &s.0).collect();
        AggregateSignature::aggregate(&refs, true)
            .map(|agg| BlsSignature(agg.to_signature()))
            .map_err(|_| CryptoError::AggregationFailed)
    }

    /// Verify an aggregate signature over a common message against the
    /// public keys of all signers.
    pub fn verify_aggregate(&self, message: &[u8], signers: &[BlsPublicKey]) -> bool {
        if signers.is_empty() {
            return false;
        }
        let refs: Vec<&PublicKey> = signers.iter().map(|k| &k.0).collect();
        self.0.fast_aggregate_verify(true, message, DST, &refs) == BLST_ERROR::BLST_SUCCESS
    }
}
