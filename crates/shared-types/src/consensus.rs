//! Consensus domain entities: blocks, votes, certificates, validator set
//! and the three peer-to-peer message shapes.

use crate::primitives::{Hash, Height, NodeId, Quorum, View, ZERO_HASH};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

/// A proposed block.
///
/// The payload is an opaque ordered sequence of signed transaction byte
/// strings; consensus never inspects it. The application state hash is NOT
/// part of the block: a proposal is created before execution, and the state
/// commitment travels inside votes and certificates instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: Height,
    pub view: View,
    pub parent_hash: Hash,
    pub payload: Vec<Vec<u8>>,
    pub proposer: NodeId,
    /// Nanoseconds since the Unix epoch, captured once by the proposer.
    /// Committed field: replicas must propagate it unchanged, never
    /// regenerate it.
    pub timestamp: u64,
}

impl Block {
    /// Deterministic block hash over
    /// `(height, view, parent_hash, payload, proposer, timestamp)`.
    ///
    /// Integers are fed big-endian; each payload item is length-prefixed
    /// with a big-endian u32 so that payload boundaries are unambiguous.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_be_bytes());
        hasher.update(self.view.to_be_bytes());
        hasher.update(self.parent_hash);
        hasher.update((self.payload.len() as u32).to_be_bytes());
        for tx in &self.payload {
            hasher.update((tx.len() as u32).to_be_bytes());
            hasher.update(tx);
        }
        hasher.update((self.proposer.len() as u32).to_be_bytes());
        hasher.update(self.proposer.as_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.finalize().into()
    }

    /// The genesis block: height 0, view 0, zero parent, empty payload.
    pub fn genesis() -> Self {
        Self {
            height: 0,
            view: 0,
            parent_hash: ZERO_HASH,
            payload: Vec::new(),
            proposer: NodeId::new(),
            timestamp: 0,
        }
    }

    /// Total payload size in bytes.
    pub fn payload_bytes(&self) -> usize {
        self.payload.iter().map(|tx| tx.len()).sum()
    }
}

/// A single validator's vote for a block, carrying the app hash that
/// validator computed by executing the block locally.
///
/// The BLS share signs the 32-byte `block_hash`; the leader enforces
/// app-hash agreement across the shares it aggregates.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub view: View,
    pub block_hash: Hash,
    pub app_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 96],
    pub from: NodeId,
}

/// A quorum certificate: proof that `2t + 1` distinct validators voted for
/// `block_hash` AND agreed on `app_hash`.
///
/// The signer list accompanies the aggregate so any replica can verify it
/// against the known validator public keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub view: View,
    pub block_hash: Hash,
    pub app_hash: Hash,
    pub agg_signature: Vec<u8>,
    pub signers: Vec<NodeId>,
}

impl Certificate {
    /// The synthetic genesis certificate: view 0, zero hashes, no signers.
    pub fn genesis() -> Self {
        Self {
            view: 0,
            block_hash: ZERO_HASH,
            app_hash: ZERO_HASH,
            agg_signature: Vec::new(),
            signers: Vec::new(),
        }
    }

    /// Whether this is the synthetic genesis certificate.
    pub fn is_genesis(&self) -> bool {
        self.view == 0 && self.block_hash == ZERO_HASH
    }
}

/// One validator's public identity.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub node_id: NodeId,
    /// Compressed BLS12-381 public key (min-pk, 48 bytes).
    #[serde_as(as = "Bytes")]
    pub bls_public_key: [u8; 48],
}

/// The ordered validator set. The ordering IS the leader-election order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    validators: Vec<ValidatorInfo>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<ValidatorInfo>) -> Self {
        Self { validators }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn quorum(&self) -> Quorum {
        Quorum::for_validators(self.validators.len())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.validators.iter().any(|v| &v.node_id == id)
    }

    pub fn public_key_of(&self, id: &NodeId) -> Option<&[u8; 48]> {
        self.validators
            .iter()
            .find(|v| &v.node_id == id)
            .map(|v| &v.bls_public_key)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.validators.iter().map(|v| &v.node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.validators.iter()
    }

    /// Position of a validator in the election order.
    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.validators.iter().position(|v| &v.node_id == id)
    }

    /// Validator at an election-order index.
    pub fn at(&self, index: usize) -> Option<&ValidatorInfo> {
        self.validators.get(index)
    }
}

/// Broadcast by the leader of a view: a new block plus the highest
/// certificate justifying it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Propose {
    pub block: Block,
    pub high_cert: Certificate,
}

/// Broadcast by the leader after aggregating votes: the new certificate,
/// optionally carrying the certified block for replicas that missed the
/// proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prepare {
    pub cert: Certificate,
    pub block: Option<Block>,
}
