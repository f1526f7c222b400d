//! In-process network simulator.
//!
//! A hub with one vote inbox per node and broadcast fan-out to registered
//! handlers. Deliveries run on spawned tasks, so the simulator exhibits
//! the same message races a real transport would.

use crate::errors::NetworkError;
use crate::ports::{ConsensusHandlers, ConsensusNetwork};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Hash, NodeId, Prepare, Propose, View, Vote};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

#[derive(Default)]
struct VoteInbox {
    votes: Mutex<Vec<Vote>>,
    notify: Notify,
}

#[derive(Default)]
struct Hub {
    handlers: RwLock<HashMap<NodeId, Arc<dyn ConsensusHandlers>>>,
    inboxes: RwLock<HashMap<NodeId, Arc<VoteInbox>>>,
}

/// The simulator hub shared by all peers of a test cluster.
#[derive(Clone, Default)]
pub struct SimNetwork {
    hub: Arc<Hub>,
}

impl SimNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the transport endpoint for a node.
    pub fn join(&self, id: NodeId) -> SimPeer {
        let inbox = Arc::new(VoteInbox::default());
        self.hub.inboxes.write().insert(id.clone(), inbox.clone());
        SimPeer {
            id,
            hub: self.hub.clone(),
            inbox,
        }
    }

    /// Register a node's inbound handlers.
    pub fn register_handlers(&self, id: NodeId, handlers: Arc<dyn ConsensusHandlers>) {
        self.hub.handlers.write().insert(id, handlers);
    }
}

/// One node's view of the simulated network.
pub struct SimPeer {
    id: NodeId,
    hub: Arc<Hub>,
    inbox: Arc<VoteInbox>,
}

impl SimPeer {
    pub fn node_id(&self) -> &NodeId {
        &self.id
    }

    /// Matching votes, deduplicated by sender.
    fn matching(&self, view: View, block_hash: &Hash) -> Vec<Vote> {
        let votes = self.inbox.votes.lock();
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for vote in votes.iter() {
            if vote.view != view || vote.block_hash != *block_hash {
                continue;
            }
            if seen.contains(&vote.from) {
                continue;
            }
            seen.push(vote.from.clone());
            out.push(vote.clone());
        }
        out
    }

    /// Whether any app-hash group within `votes` reaches the threshold.
    fn threshold_met(votes: &[Vote], need: usize) -> bool {
        let mut counts: HashMap<Hash, usize> = HashMap::new();
        for vote in votes {
            let n = counts.entry(vote.app_hash).or_insert(0);
            *n += 1;
            if *n >= need {
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl ConsensusNetwork for SimPeer {
    async fn broadcast_propose(&self, propose: Propose) -> Result<(), NetworkError> {
        let handlers: Vec<Arc<dyn ConsensusHandlers>> =
            self.hub.handlers.read().values().cloned().collect();
        trace!(from = %self.id, view = propose.block.view, peers = handlers.len(), "broadcast propose");
        for handler in handlers {
            let message = propose.clone();
            tokio::spawn(async move { handler.handle_propose(message).await });
        }
        Ok(())
    }

    async fn broadcast_prepare(&self, prepare: Prepare) -> Result<(), NetworkError> {
        let handlers: Vec<Arc<dyn ConsensusHandlers>> =
            self.hub.handlers.read().values().cloned().collect();
        trace!(from = %self.id, view = prepare.cert.view, peers = handlers.len(), "broadcast prepare");
        for handler in handlers {
            let message = prepare.clone();
            tokio::spawn(async move { handler.handle_prepare(message).await });
        }
        Ok(())
    }

    async fn send_vote(&self, to: &NodeId, vote: Vote) -> Result<(), NetworkError> {
        let inbox = self
            .hub
            .inboxes
            .read()
            .get(to)
            .cloned()
            .ok_or_else(|| NetworkError::UnknownPeer(to.clone()))?;
        {
            let mut votes = inbox.votes.lock();
            // Drop stale views so the inbox does not grow without bound.
            let horizon = vote.view.saturating_sub(8);
            votes.retain(|v| v.view >= horizon);
            votes.push(vote);
        }
        inbox.notify.notify_waiters();
        Ok(())
    }

    async fn collect_votes(
        &self,
        view: View,
        block_hash: Hash,
        need: usize,
        timeout: Duration,
    ) -> Result<Vec<Vote>, NetworkError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.inbox.notify.notified();
            let votes = self.matching(view, &block_hash);
            if Self::threshold_met(&votes, need) {
                return Ok(votes);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero()
                || tokio::time::timeout(remaining, notified).await.is_err()
            {
                return Err(NetworkError::CollectTimeout {
                    got: votes.len(),
                    need,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    fn vote(view: View, block_hash: Hash, app_hash: Hash, from: &str) -> Vote {
        Vote {
            view,
            block_hash,
            app_hash,
            signature: [0u8; 96],
            from: from.to_string(),
        }
    }

    #[derive(Default)]
    struct RecordingHandlers {
        proposes: PlMutex<Vec<Propose>>,
        prepares: PlMutex<Vec<Prepare>>,
    }

    #[async_trait]
    impl ConsensusHandlers for RecordingHandlers {
        async fn handle_propose(&self, propose: Propose) {
            self.proposes.lock().push(propose);
        }
        async fn handle_prepare(&self, prepare: Prepare) {
            self.prepares.lock().push(prepare);
        }
    }

    #[tokio::test]
    async fn collect_returns_once_threshold_met() {
        let net = SimNetwork::new();
        let leader = net.join("val-1".to_string());
        let sender = net.join("val-2".to_string());

        let block_hash = [7u8; 32];
        let app_hash = [9u8; 32];
        let collector = tokio::spawn(async move {
            leader
                .collect_votes(3, block_hash, 3, Duration::from_secs(2))
                .await
        });

        for from in ["val-2", "val-3", "val-4"] {
            sender
                .send_vote(&"val-1".to_string(), vote(3, block_hash, app_hash, from))
                .await
                .unwrap();
        }

        let votes = collector.await.unwrap().unwrap();
        assert_eq!(votes.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_senders_count_once() {
        let net = SimNetwork::new();
        let leader = net.join("val-1".to_string());
        let sender = net.join("val-2".to_string());

        let block_hash = [7u8; 32];
        for _ in 0..5 {
            sender
                .send_vote(&"val-1".to_string(), vote(1, block_hash, [1u8; 32], "val-2"))
                .await
                .unwrap();
        }
        let err = leader
            .collect_votes(1, block_hash, 2, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, NetworkError::CollectTimeout { got: 1, need: 2 });
    }

    #[tokio::test]
    async fn divergent_app_hashes_do_not_satisfy_threshold() {
        let net = SimNetwork::new();
        let leader = net.join("val-1".to_string());
        let sender = net.join("val-2".to_string());

        let block_hash = [7u8; 32];
        sender
            .send_vote(&"val-1".to_string(), vote(1, block_hash, [1u8; 32], "val-2"))
            .await
            .unwrap();
        sender
            .send_vote(&"val-1".to_string(), vote(1, block_hash, [2u8; 32], "val-3"))
            .await
            .unwrap();

        // Two votes, but no app-hash group of two.
        let err = leader
            .collect_votes(1, block_hash, 2, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, NetworkError::CollectTimeout { got: 2, need: 2 });

        // A third vote agreeing with val-2 completes the group.
        sender
            .send_vote(&"val-1".to_string(), vote(1, block_hash, [1u8; 32], "val-4"))
            .await
            .unwrap();
        let votes = leader
            .collect_votes(1, block_hash, 2, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(votes.len(), 3);
    }

    #[tokio::test]
    async fn unknown_peer_is_an_error() {
        let net = SimNetwork::new();
        let peer = net.join("val-1".to_string());
        let err = peer
            .send_vote(&"nobody".to_string(), vote(1, [0u8; 32], [0u8; 32], "val-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::UnknownPeer(_)));
    }

    #[tokio::test]
    async fn broadcast_reaches_registered_handlers() {
        let net = SimNetwork::new();
        let peer = net.join("val-1".to_string());
        let recorder = Arc::new(RecordingHandlers::default());
        net.register_handlers("val-2".to_string(), recorder.clone());

        let propose = Propose {
            block: shared_types::Block::genesis(),
            high_cert: shared_types::Certificate::genesis(),
        };
        peer.broadcast_propose(propose.clone()).await.unwrap();

        // Deliveries run on spawned tasks.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(recorder.proposes.lock().len(), 1);
        assert_eq!(recorder.proposes.lock()[0], propose);
    }
}
