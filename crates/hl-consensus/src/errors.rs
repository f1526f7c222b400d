//! Consensus error types.

use hl_network::NetworkError;
use hl_storage::StoreError;
use shared_types::{Hash, NodeId, View};
use thiserror::Error;

/// Consensus engine error type.
///
/// Network and quorum failures terminate the current view only; the
/// engine proceeds to the next. Store failures and proven state
/// divergence are fatal-visible.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Could not assemble `2t + 1` agreeing votes in time.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Persistence failure (fatal-visible).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Enough votes arrived but no app-hash group reached the quorum:
    /// proven state divergence among validators.
    #[error("byzantine app-hash divergence at view {view}")]
    ByzantineStateDivergence {
        view: View,
        block_hash: Hash,
        /// Every voter and the app hash it claimed.
        votes: Vec<(NodeId, Hash)>,
    },

    /// Vote share aggregation failed.
    #[error("vote aggregation failed: {0}")]
    Aggregation(String),
}
