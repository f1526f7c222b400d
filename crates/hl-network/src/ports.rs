//! The network contract.

use crate::errors::NetworkError;
use async_trait::async_trait;
use shared_types::{Hash, NodeId, Prepare, Propose, View, Vote};
use std::time::Duration;

/// Inbound message handlers, implemented by the consensus engine and
/// registered with the transport.
#[async_trait]
pub trait ConsensusHandlers: Send + Sync {
    /// A proposal arrived on the propose topic.
    async fn handle_propose(&self, propose: Propose);
    /// A prepare arrived on the prepare topic.
    async fn handle_prepare(&self, prepare: Prepare);
}

/// Outbound operations the engine performs against the transport.
#[async_trait]
pub trait ConsensusNetwork: Send + Sync {
    /// Broadcast a proposal to every validator (including self).
    async fn broadcast_propose(&self, propose: Propose) -> Result<(), NetworkError>;

    /// Broadcast a prepare to every validator (including self).
    async fn broadcast_prepare(&self, prepare: Prepare) -> Result<(), NetworkError>;

    /// Unicast a vote to the designated leader of the vote's view.
    async fn send_vote(&self, to: &NodeId, vote: Vote) -> Result<(), NetworkError>;

    /// Collect votes for `(view, block_hash)`.
    ///
    /// Reactive: returns as soon as `need` distinct senders agree on one
    /// `app_hash` (the caller still verifies the shares and re-groups),
    /// or fails with `CollectTimeout` when the deadline passes first.
    /// Votes for other views or blocks are discarded; duplicate senders
    /// count once.
    async fn collect_votes(
        &self,
        view: View,
        block_hash: Hash,
        need: usize,
        timeout: Duration,
    ) -> Result<Vec<Vote>, NetworkError>;
}
