//! The safety module: block/certificate cache and the HotStuff locking
//! rule.

use crate::state::NodeState;
use parking_lot::RwLock;
use shared_types::{Block, Certificate, Hash, Propose};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-heavy cache of blocks plus the lock/highest-certificate rules.
/// Mutated by the engine handlers; reads see a consistent view through
/// the shared [`NodeState`].
#[derive(Debug)]
pub struct SafetyModule {
    blocks: RwLock<HashMap<Hash, Block>>,
    state: Arc<NodeState>,
}

impl SafetyModule {
    pub fn new(state: Arc<NodeState>) -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            state,
        }
    }

    /// The highest certificate observed, or the synthetic genesis
    /// certificate before any prepare has been seen.
    pub fn highest_cert(&self) -> Certificate {
        self.state.highest_cert().unwrap_or_else(Certificate::genesis)
    }

    /// Store a block in the cache.
    pub fn insert_block(&self, block: Block) {
        self.blocks.write().insert(block.hash(), block);
    }

    pub fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.blocks.read().get(hash).cloned()
    }

    /// Record an observed prepare: keep the block and raise the highest
    /// certificate if this one is newer.
    pub fn on_prepare(&self, cert: &Certificate, block: Option<&Block>) {
        if let Some(block) = block {
            self.insert_block(block.clone());
        }
        if cert.view > self.highest_cert().view {
            self.state.set_highest_cert(cert.clone());
        }
    }

    /// Called on commit: lock the committed pair and adopt its
    /// certificate as highest.
    pub fn update_lock(&self, cert: &Certificate, block: &Block) {
        self.state.set_locked(block.clone(), cert.clone());
        if cert.view >= self.highest_cert().view {
            self.state.set_highest_cert(cert.clone());
        }
    }

    /// The HotStuff locking rule: never vote for a proposal whose
    /// justification is older than the locked view.
    pub fn can_vote(&self, propose: &Propose) -> bool {
        match self.state.locked() {
            None => true,
            Some((_, locked_cert)) => propose.high_cert.view >= locked_cert.view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ZERO_HASH;

    fn block(view: u64, height: u64) -> Block {
        Block {
            height,
            view,
            parent_hash: ZERO_HASH,
            payload: Vec::new(),
            proposer: "val-1".into(),
            timestamp: view,
        }
    }

    fn cert_for(block: &Block) -> Certificate {
        Certificate {
            view: block.view,
            block_hash: block.hash(),
            app_hash: [9u8; 32],
            agg_signature: Vec::new(),
            signers: vec!["val-1".into()],
        }
    }

    #[test]
    fn highest_cert_defaults_to_genesis() {
        let safety = SafetyModule::new(Arc::new(NodeState::new()));
        assert!(safety.highest_cert().is_genesis());
    }

    #[test]
    fn on_prepare_raises_highest_cert_monotonically() {
        let safety = SafetyModule::new(Arc::new(NodeState::new()));
        let b3 = block(3, 1);
        let b2 = block(2, 1);
        safety.on_prepare(&cert_for(&b3), Some(&b3));
        assert_eq!(safety.highest_cert().view, 3);

        // An older certificate does not lower the watermark.
        safety.on_prepare(&cert_for(&b2), Some(&b2));
        assert_eq!(safety.highest_cert().view, 3);
        // But its block is still cached.
        assert_eq!(safety.block_by_hash(&b2.hash()), Some(b2));
    }

    #[test]
    fn locking_rule_rejects_stale_justifications() {
        let state = Arc::new(NodeState::new());
        let safety = SafetyModule::new(state);

        let locked_block = block(5, 2);
        safety.update_lock(&cert_for(&locked_block), &locked_block);

        let fresh = Propose {
            block: block(7, 3),
            high_cert: cert_for(&block(6, 2)),
        };
        assert!(safety.can_vote(&fresh));

        let equal = Propose {
            block: block(7, 3),
            high_cert: cert_for(&locked_block),
        };
        assert!(safety.can_vote(&equal));

        let stale = Propose {
            block: block(7, 3),
            high_cert: cert_for(&block(4, 1)),
        };
        assert!(!safety.can_vote(&stale));
    }

    #[test]
    fn no_lock_means_always_votable() {
        let safety = SafetyModule::new(Arc::new(NodeState::new()));
        let propose = Propose {
            block: block(1, 1),
            high_cert: Certificate::genesis(),
        };
        assert!(safety.can_vote(&propose));
    }
}
