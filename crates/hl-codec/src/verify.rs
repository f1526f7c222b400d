//! Envelope verification: digest, recover, compare to owner.

use crate::delegation::DelegationRegistry;
use crate::envelope::{decode_signature, Envelope, ParsedCancel, ParsedOrder};
use crate::errors::CodecError;
use crate::typed_data::{cancel_digest, order_digest, TypedDomain};
use shared_crypto::{recover_address, EcdsaKeyPair, RecoverableSignature};

/// A transaction whose signature has been verified against its owner (or
/// the owner's delegated agent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifiedTx {
    Order(ParsedOrder),
    Cancel(ParsedCancel),
}

impl VerifiedTx {
    /// The nonce this transaction consumes.
    pub fn nonce(&self) -> u64 {
        match self {
            VerifiedTx::Order(o) => o.nonce,
            VerifiedTx::Cancel(c) => c.nonce,
        }
    }

    /// The account the transaction is attributed to.
    pub fn owner(&self) -> shared_types::Address {
        match self {
            VerifiedTx::Order(o) => o.owner,
            VerifiedTx::Cancel(c) => c.owner,
        }
    }
}

/// Parse and verify a raw envelope.
///
/// For an agent-mode order, the order signature must recover to the
/// delegated agent and the delegation (looked up by id) must itself carry
/// a valid wallet signature; the transaction is attributed to the wallet.
pub fn verify_envelope(
    raw: &[u8],
    domain: &TypedDomain,
    delegations: &DelegationRegistry,
    now: u64,
) -> Result<VerifiedTx, CodecError> {
    match Envelope::from_bytes(raw)? {
        Envelope::Order { order, signature } => {
            let parsed = order.parse()?;
            let sig_bytes = decode_signature(&signature)?;
            let sig = RecoverableSignature::from_slice(&sig_bytes)
                .map_err(|_| CodecError::InvalidSignature)?;
            let expected = if parsed.agent_mode {
                let id = parsed
                    .delegation_id
                    .as_deref()
                    .ok_or_else(|| {
                        CodecError::InvalidFormat("agent_mode without delegation_id".to_string())
                    })?;
                delegations.resolve(id, &parsed.owner, now, domain)?
            } else {
                parsed.owner
            };
            let digest = order_digest(&parsed, domain);
            let signer =
                recover_address(&digest, &sig).map_err(|_| CodecError::InvalidSignature)?;
            if signer != expected {
                return Err(CodecError::InvalidSignature);
            }
            Ok(VerifiedTx::Order(parsed))
        }
        Envelope::Cancel { cancel, signature } => {
            let parsed = cancel.parse()?;
            let sig_bytes = decode_signature(&signature)?;
            let sig = RecoverableSignature::from_slice(&sig_bytes)
                .map_err(|_| CodecError::InvalidSignature)?;
            let digest = cancel_digest(&parsed, domain);
            let signer =
                recover_address(&digest, &sig).map_err(|_| CodecError::InvalidSignature)?;
            if signer != parsed.owner {
                return Err(CodecError::InvalidSignature);
            }
            Ok(VerifiedTx::Cancel(parsed))
        }
    }
}

/// Enforce the deadline against the executing block's timestamp. A zero
/// deadline means no expiry.
pub fn check_deadline(deadline: u64, block_timestamp: u64) -> Result<(), CodecError> {
    if deadline != 0 && deadline < block_timestamp {
        return Err(CodecError::Expired {
            deadline,
            now: block_timestamp,
        });
    }
    Ok(())
}

/// Build and sign an order envelope. Client and test helper.
pub fn sign_order(
    keypair: &EcdsaKeyPair,
    order: &ParsedOrder,
    domain: &TypedDomain,
) -> Result<Envelope, CodecError> {
    let digest = order_digest(order, domain);
    let sig = keypair
        .sign_digest(&digest)
        .map_err(|_| CodecError::InvalidSignature)?;
    Ok(Envelope::Order {
        order: order.to_payload(),
        signature: format!("0x{}", hex::encode(sig.as_bytes())),
    })
}

/// Build and sign a cancel envelope. Client and test helper.
pub fn sign_cancel(
    keypair: &EcdsaKeyPair,
    cancel: &ParsedCancel,
    domain: &TypedDomain,
) -> Result<Envelope, CodecError> {
    let digest = cancel_digest(cancel, domain);
    let sig = keypair
        .sign_digest(&digest)
        .map_err(|_| CodecError::InvalidSignature)?;
    Ok(Envelope::Cancel {
        cancel: cancel.to_payload(),
        signature: format!("0x{}", hex::encode(sig.as_bytes())),
    })
}
