//! Typed-data digests.
//!
//! Orders sign an EIP-712 digest: a domain separator over
//! `{name, version, chainId, verifyingContract}` combined with the
//! `Order` struct hash under the `\x19\x01` prefix. Cancels and agent
//! delegations use a simpler domain-bound Keccak of a canonical string.
//! These schemas are fixed wire formats: clients and validators must
//! reproduce them bit-exactly.

use crate::envelope::{ParsedCancel, ParsedOrder};
use shared_crypto::keccak256;
use shared_types::{Address, Hash};

/// The EIP-712 domain. `name` and `version` are protocol constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl TypedDomain {
    /// The protocol domain for a chain id.
    pub fn hyperlicked(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: "HyperLicked".to_string(),
            version: "1".to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// `keccak256(DOMAIN_TYPEHASH || keccak(name) || keccak(version) ||
    /// uint256(chainId) || address(verifyingContract))`.
    pub fn separator(&self) -> Hash {
        let mut buf = Vec::with_capacity(160);
        buf.extend_from_slice(&keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        ));
        buf.extend_from_slice(&keccak256(self.name.as_bytes()));
        buf.extend_from_slice(&keccak256(self.version.as_bytes()));
        buf.extend_from_slice(&u256_word(self.chain_id));
        buf.extend_from_slice(&address_word(&self.verifying_contract));
        keccak256(&buf)
    }
}

/// Left-pad a u64 into a 32-byte big-endian word.
fn u256_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-pad a 20-byte address into a 32-byte word.
fn address_word(addr: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&addr.0);
    word
}

/// EIP-712 digest of an order under the given domain.
pub fn order_digest(order: &ParsedOrder, domain: &TypedDomain) -> Hash {
    let type_hash = keccak256(
        b"Order(string symbol,uint8 side,uint8 orderType,uint256 price,uint256 qty,uint256 nonce,uint256 deadline,uint256 leverage,address owner)",
    );
    let side: u64 = match order.side {
        hl_book::Side::Buy => 1,
        hl_book::Side::Sell => 2,
    };
    let order_type: u64 = match order.order_type {
        hl_book::OrderType::Gtc => 1,
        hl_book::OrderType::Ioc => 2,
        hl_book::OrderType::Alo => 3,
    };

    let mut buf = Vec::with_capacity(320);
    buf.extend_from_slice(&type_hash);
    buf.extend_from_slice(&keccak256(order.symbol.as_bytes()));
    buf.extend_from_slice(&u256_word(side));
    buf.extend_from_slice(&u256_word(order_type));
    buf.extend_from_slice(&u256_word(order.price));
    buf.extend_from_slice(&u256_word(order.qty));
    buf.extend_from_slice(&u256_word(order.nonce));
    buf.extend_from_slice(&u256_word(order.deadline));
    buf.extend_from_slice(&u256_word(order.leverage as u64));
    buf.extend_from_slice(&address_word(&order.owner));
    let struct_hash = keccak256(&buf);

    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(b"\x19\x01");
    preimage.extend_from_slice(&domain.separator());
    preimage.extend_from_slice(&struct_hash);
    keccak256(&preimage)
}

/// Domain-bound canonical-string digest of a cancel.
pub fn cancel_digest(cancel: &ParsedCancel, domain: &TypedDomain) -> Hash {
    let canonical = format!(
        "{}:{}:{}:cancel:{}:{}:{}:{}",
        domain.name,
        domain.version,
        domain.chain_id,
        cancel.symbol,
        cancel.order_id,
        cancel.nonce,
        cancel.owner.to_hex(),
    );
    keccak256(canonical.as_bytes())
}

/// Domain-bound canonical-string digest of an agent delegation, signed by
/// the wallet key.
pub fn delegation_digest(
    wallet: &Address,
    agent: &Address,
    expiry: u64,
    domain: &TypedDomain,
) -> Hash {
    let canonical = format!(
        "{}:{}:{}:approve-agent:{}:{}:{}",
        domain.name,
        domain.version,
        domain.chain_id,
        wallet.to_hex(),
        agent.to_hex(),
        expiry,
    );
    keccak256(canonical.as_bytes())
}
