//! Identity and numeric primitives shared by every subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// The all-zero hash, used for genesis parents and empty app state.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Opaque validator identifier. The operator maintains the bijection
/// between `NodeId` and the transport-level peer identity.
pub type NodeId = String;

/// Monotone block-commit counter. Advances only when a block commits.
pub type Height = u64;

/// Monotone round counter. Advances every round; each view has exactly
/// one designated leader.
pub type View = u64;

/// A 20-byte account address, recovered from secp256k1 signatures.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid signer.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Hex representation with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s).ok_or(())
    }
}

/// Byzantine quorum parameters: `n` validators tolerating `t` faults,
/// requiring `n >= 3t + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    /// Total validator count.
    pub n: usize,
    /// Tolerated Byzantine faults.
    pub t: usize,
}

impl Quorum {
    /// Derive the largest tolerable `t` from a validator count.
    pub fn for_validators(n: usize) -> Self {
        let t = n.saturating_sub(1) / 3;
        Self { n, t }
    }

    /// Votes required for a certificate: `2t + 1`.
    pub fn need(&self) -> usize {
        2 * self.t + 1
    }

    /// Whether the parameters satisfy `n >= 3t + 1`.
    pub fn is_valid(&self) -> bool {
        self.n >= 3 * self.t + 1 && self.n > 0
    }
}

/// Render a hash as a short hex prefix for log lines.
pub fn short_hash(h: &Hash) -> String {
    hex::encode(&h[..6])
}
