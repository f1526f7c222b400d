//! Agent delegation registry.
//!
//! A wallet may authorize an agent key to sign orders on its behalf. The
//! delegation itself is signed by the wallet; orders signed by the agent
//! are attributed to the wallet once both signatures check out.

use crate::errors::CodecError;
use crate::typed_data::{delegation_digest, TypedDomain};
use parking_lot::RwLock;
use shared_crypto::{recover_address, RecoverableSignature};
use shared_types::Address;
use std::collections::HashMap;

/// A wallet-signed authorization for an agent key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub wallet: Address,
    pub agent: Address,
    /// Expiry timestamp (same clock as block timestamps); zero means
    /// no expiry.
    pub expiry: u64,
    /// Wallet signature over the delegation digest.
    pub signature: [u8; 65],
}

/// Registry of delegations by id.
#[derive(Debug, Default)]
pub struct DelegationRegistry {
    delegations: RwLock<HashMap<String, Delegation>>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, delegation: Delegation) {
        self.delegations.write().insert(id.into(), delegation);
    }

    pub fn get(&self, id: &str) -> Option<Delegation> {
        self.delegations.read().get(id).cloned()
    }

    /// Resolve and fully verify a delegation for an order owner.
    ///
    /// Returns the agent address the order signature must recover to.
    pub fn resolve(
        &self,
        id: &str,
        owner: &Address,
        now: u64,
        domain: &TypedDomain,
    ) -> Result<Address, CodecError> {
        let delegation = self
            .get(id)
            .ok_or_else(|| CodecError::UnknownDelegation(id.to_string()))?;
        if delegation.wallet != *owner {
            return Err(CodecError::UnknownDelegation(id.to_string()));
        }
        if delegation.expiry != 0 && delegation.expiry < now {
            return Err(CodecError::ExpiredDelegation);
        }
        let digest =
            delegation_digest(&delegation.wallet, &delegation.agent, delegation.expiry, domain);
        let sig = RecoverableSignature::from_slice(&delegation.signature)
            .map_err(|_| CodecError::DelegationSignatureInvalid)?;
        let signer =
            recover_address(&digest, &sig).map_err(|_| CodecError::DelegationSignatureInvalid)?;
        if signer != delegation.wallet {
            return Err(CodecError::DelegationSignatureInvalid);
        }
        Ok(delegation.agent)
    }
}
