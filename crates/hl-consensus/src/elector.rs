//! Leader election.

use shared_types::{NodeId, ValidatorSet, View};

/// Round-robin elector over the configured validator order:
/// `leader(v) = ids[(v - 1) mod n]`.
///
/// Deliberately stateless and deterministic; a stake- or VRF-based
/// elector can replace it behind the same `leader(view)` call.
#[derive(Clone, Debug)]
pub struct RoundRobinElector {
    validators: ValidatorSet,
}

impl RoundRobinElector {
    pub fn new(validators: ValidatorSet) -> Self {
        Self { validators }
    }

    /// The designated leader of a view (views start at 1).
    pub fn leader(&self, view: View) -> NodeId {
        let n = self.validators.len() as u64;
        let index = (view.max(1) - 1) % n;
        self.validators
            .at(index as usize)
            .map(|v| v.node_id.clone())
            .unwrap_or_default()
    }
}
