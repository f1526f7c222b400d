//! Network error types.

use shared_types::NodeId;
use thiserror::Error;

/// Network contract error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// No transport mapping for the node id.
    #[error("unknown peer: {0}")]
    UnknownPeer(NodeId),

    /// Vote collection ran out of time before reaching the threshold.
    #[error("vote collection timed out: got {got} of {need}")]
    CollectTimeout { got: usize, need: usize },

    /// The transport is shutting down.
    #[error("network channel closed")]
    ChannelClosed,
}
