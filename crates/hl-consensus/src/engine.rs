//! The propose / vote / prepare state machine.

use crate::elector::RoundRobinElector;
use crate::errors::ConsensusError;
use crate::pacemaker::Pacemaker;
use crate::ports::Application;
use crate::safety::SafetyModule;
use crate::state::NodeState;
use async_trait::async_trait;
use hl_network::{ConsensusHandlers, ConsensusNetwork};
use hl_storage::BlockStore;
use shared_crypto::{BlsKeyPair, BlsPublicKey, BlsSignature};
use shared_types::{
    short_hash, Block, Certificate, CommittedTip, Hash, NodeId, Prepare, Propose, ValidatorSet,
    View, Vote,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Engine timing parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Upper bound on leader vote collection.
    pub vote_timeout: Duration,
    /// Follower proposal-plus-commit budget.
    pub ppc: Duration,
    /// Network delay allowance on top of `ppc`.
    pub delta: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vote_timeout: Duration::from_secs(3),
            ppc: Duration::from_secs(3),
            delta: Duration::from_secs(1),
        }
    }
}

/// Emitted to the runtime whenever a block commits.
#[derive(Clone, Debug)]
pub struct CommittedEvent {
    pub block: Block,
    pub cert: Certificate,
}

/// The consensus engine of one validator.
pub struct Engine<N, S, A>
where
    N: ConsensusNetwork,
    S: BlockStore,
    A: Application,
{
    node_id: NodeId,
    validators: ValidatorSet,
    elector: RoundRobinElector,
    bls: BlsKeyPair,
    config: EngineConfig,
    state: Arc<NodeState>,
    safety: Arc<SafetyModule>,
    pacemaker: Pacemaker,
    network: Arc<N>,
    store: S,
    app: A,
    committed_tx: Option<mpsc::UnboundedSender<CommittedEvent>>,
    shutdown: watch::Receiver<bool>,
}

impl<N, S, A> Engine<N, S, A>
where
    N: ConsensusNetwork,
    S: BlockStore,
    A: Application,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_id: NodeId,
        validators: ValidatorSet,
        bls: BlsKeyPair,
        config: EngineConfig,
        network: Arc<N>,
        store: S,
        app: A,
        committed_tx: Option<mpsc::UnboundedSender<CommittedEvent>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let state = Arc::new(NodeState::new());
        let safety = Arc::new(SafetyModule::new(state.clone()));
        let pacemaker = Pacemaker::new(state.clone(), config.ppc, config.delta);
        Self {
            elector: RoundRobinElector::new(validators.clone()),
            node_id,
            validators,
            bls,
            config,
            state,
            safety,
            pacemaker,
            network,
            store,
            app,
            committed_tx,
            shutdown,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    pub fn safety(&self) -> &Arc<SafetyModule> {
        &self.safety
    }

    /// Main loop: lead the views we are elected for, follow the rest.
    /// Any per-view failure ends that view only.
    pub async fn run(self: Arc<Self>) {
        info!(node = %self.node_id, "consensus engine started");
        loop {
            if *self.shutdown.borrow() {
                info!(node = %self.node_id, "consensus engine stopped");
                return;
            }
            let view = self.state.view() + 1;
            if self.elector.leader(view) == self.node_id {
                match self.leader_round(view).await {
                    Ok(()) => {}
                    Err(ConsensusError::ByzantineStateDivergence {
                        view,
                        block_hash,
                        ref votes,
                    }) => {
                        // Fatal-visible: full attribution for the operator.
                        for (voter, app_hash) in votes {
                            error!(
                                node = %self.node_id,
                                view,
                                block = %short_hash(&block_hash),
                                voter = %voter,
                                app_hash = %short_hash(app_hash),
                                "app-hash divergence"
                            );
                        }
                    }
                    Err(err) => {
                        warn!(node = %self.node_id, view, error = %err, "leader round failed");
                    }
                }
                // Success or failure, the view is spent.
                self.state.advance_view(view);
            } else {
                self.pacemaker.wait_for_view_advance(view).await;
            }
        }
    }

    /// One leader round: propose, collect votes, certify, prepare.
    pub async fn leader_round(&self, view: View) -> Result<(), ConsensusError> {
        let high = self.safety.highest_cert();
        let parent = self
            .safety
            .block_by_hash(&high.block_hash)
            .unwrap_or_else(Block::genesis);
        let height = parent.height + 1;

        let payload = self.app.prepare_payload(&parent, height);
        let block = Block {
            height,
            view,
            parent_hash: high.block_hash,
            payload,
            proposer: self.node_id.clone(),
            timestamp: now_nanos(),
        };
        let block_hash = block.hash();
        info!(
            node = %self.node_id,
            view,
            height,
            block = %short_hash(&block_hash),
            txs = block.payload.len(),
            "proposing"
        );

        self.network
            .broadcast_propose(Propose {
                block: block.clone(),
                high_cert: high.clone(),
            })
            .await?;
        self.safety.insert_block(block.clone());
        self.store.put_block(&block)?;

        let need = self.validators.quorum().need();
        let votes = self
            .network
            .collect_votes(view, block_hash, need, self.config.vote_timeout)
            .await?;

        let cert = self.certify(view, block_hash, votes, need)?;
        self.store.put_certificate(&cert)?;
        self.network
            .broadcast_prepare(Prepare {
                cert,
                block: Some(block),
            })
            .await?;
        self.state.advance_view(view);
        Ok(())
    }

    /// Validate the collected votes and aggregate the winning app-hash
    /// group into a certificate. Dissenting voters are logged with
    /// attribution; if no group reaches the quorum the divergence is
    /// proven and fatal for the round.
    fn certify(
        &self,
        view: View,
        block_hash: Hash,
        votes: Vec<Vote>,
        need: usize,
    ) -> Result<Certificate, ConsensusError> {
        let mut groups: BTreeMap<Hash, Vec<Vote>> = BTreeMap::new();
        let mut valid = 0usize;
        for vote in votes {
            let Some(key_bytes) = self.validators.public_key_of(&vote.from) else {
                warn!(node = %self.node_id, voter = %vote.from, "vote from non-validator");
                continue;
            };
            let share_ok = BlsPublicKey::from_bytes(key_bytes)
                .map(|pk| {
                    BlsSignature::from_bytes(&vote.signature)
                        .map(|sig| pk.verify(&vote.block_hash, &sig))
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            if !share_ok {
                warn!(node = %self.node_id, voter = %vote.from, "invalid vote share");
                continue;
            }
            valid += 1;
            groups.entry(vote.app_hash).or_default().push(vote);
        }

        let winner: Option<Hash> = groups
            .iter()
            .filter(|(_, group)| group.len() >= need)
            .max_by_key(|(_, group)| group.len())
            .map(|(hash, _)| *hash);
        let Some(app_hash) = winner else {
            if valid >= need {
                return Err(ConsensusError::ByzantineStateDivergence {
                    view,
                    block_hash,
                    votes: groups
                        .into_values()
                        .flatten()
                        .map(|v| (v.from, v.app_hash))
                        .collect(),
                });
            }
            return Err(hl_network::NetworkError::CollectTimeout { got: valid, need }.into());
        };

        for (dissent_hash, dissenters) in &groups {
            if *dissent_hash == app_hash {
                continue;
            }
            for vote in dissenters {
                error!(
                    node = %self.node_id,
                    view,
                    voter = %vote.from,
                    claimed = %short_hash(&vote.app_hash),
                    agreed = %short_hash(&app_hash),
                    "dissenting vote excluded from certificate"
                );
            }
        }

        let group = &groups[&app_hash];
        let shares: Vec<BlsSignature> = group
            .iter()
            .filter_map(|v| BlsSignature::from_bytes(&v.signature).ok())
            .collect();
        let aggregate = BlsSignature::aggregate(&shares)
            .map_err(|e| ConsensusError::Aggregation(e.to_string()))?;
        Ok(Certificate {
            view,
            block_hash,
            app_hash,
            agg_signature: aggregate.to_bytes().to_vec(),
            signers: group.iter().map(|v| v.from.clone()).collect(),
        })
    }

    /// Verify a certificate's aggregate against the validator key set.
    fn verify_certificate(&self, cert: &Certificate) -> bool {
        if cert.is_genesis() {
            return true;
        }
        if cert.signers.len() < self.validators.quorum().need() {
            return false;
        }
        let mut keys = Vec::with_capacity(cert.signers.len());
        for signer in &cert.signers {
            let Some(bytes) = self.validators.public_key_of(signer) else {
                return false;
            };
            let Ok(key) = BlsPublicKey::from_bytes(bytes) else {
                return false;
            };
            if cert.signers.iter().filter(|s| *s == signer).count() > 1 {
                return false;
            }
            keys.push(key);
        }
        BlsSignature::from_slice(&cert.agg_signature)
            .map(|sig| sig.verify_aggregate(&cert.block_hash, &keys))
            .unwrap_or(false)
    }

    /// Follower handler: persist, apply the locking rule, execute, vote.
    async fn on_propose(&self, propose: Propose) {
        let block = propose.block.clone();
        let block_hash = block.hash();
        let expected_leader = self.elector.leader(block.view);
        if block.proposer != expected_leader {
            warn!(
                node = %self.node_id,
                view = block.view,
                proposer = %block.proposer,
                expected = %expected_leader,
                "proposal from non-leader dropped"
            );
            return;
        }
        self.safety.insert_block(block.clone());
        if let Err(err) = self.store.put_block(&block) {
            error!(node = %self.node_id, error = %err, "failed to persist proposal");
            return;
        }

        if !self.safety.can_vote(&propose) {
            debug!(
                node = %self.node_id,
                view = block.view,
                block = %short_hash(&block_hash),
                "locking rule rejects proposal"
            );
            return;
        }

        // Execute BEFORE voting: the vote carries the state commitment.
        let app_hash = self.app.on_commit(&block);
        let share = self.bls.sign(&block_hash);
        let vote = Vote {
            view: block.view,
            block_hash,
            app_hash,
            signature: share.to_bytes(),
            from: self.node_id.clone(),
        };
        let leader = self.elector.leader(block.view);
        if let Err(err) = self.network.send_vote(&leader, vote).await {
            warn!(node = %self.node_id, view = block.view, error = %err, "vote delivery failed");
        }
    }

    /// Follower handler: persist the certificate, raise the safety
    /// watermarks, wake the pacemaker, then attempt the two-chain commit.
    async fn on_prepare(&self, prepare: Prepare) {
        let cert = prepare.cert;
        if !self.verify_certificate(&cert) {
            warn!(node = %self.node_id, view = cert.view, "invalid certificate dropped");
            return;
        }
        if let Err(err) = self.store.put_certificate(&cert) {
            error!(node = %self.node_id, error = %err, "failed to persist certificate");
            return;
        }
        if let Some(block) = &prepare.block {
            if let Err(err) = self.store.put_block(block) {
                error!(node = %self.node_id, error = %err, "failed to persist prepare block");
                return;
            }
        }
        self.safety.on_prepare(&cert, prepare.block.as_ref());
        self.pacemaker.signal_view_advance(cert.view);

        if let Err(err) = self.try_two_chain_commit(&cert) {
            error!(node = %self.node_id, view = cert.view, error = %err, "commit failed");
        }
    }

    /// The two-chain rule: if the certified block's parent is the block
    /// certified one view earlier, that parent becomes final, stamped
    /// with the app hash its certificate carries. Blocks whose children
    /// never form the chain relation are skipped.
    fn try_two_chain_commit(&self, cert: &Certificate) -> Result<(), ConsensusError> {
        if cert.view == 0 {
            return Ok(());
        }
        let Some(prev_cert) = self.store.certificate_by_view(cert.view - 1)? else {
            return Ok(());
        };
        if prev_cert.is_genesis() {
            return Ok(());
        }
        let Some(certified) = self.safety.block_by_hash(&cert.block_hash) else {
            return Ok(());
        };
        if certified.parent_hash != prev_cert.block_hash {
            return Ok(());
        }
        let Some(committed_block) = self.safety.block_by_hash(&prev_cert.block_hash) else {
            return Ok(());
        };
        if self.state.height() >= committed_block.height {
            // Already committed through another prepare.
            return Ok(());
        }

        // Every committing replica has applied the block: replicas that
        // voted hit the idempotence memo, late ones execute now.
        let local_hash = self.app.on_commit(&committed_block);
        if local_hash != prev_cert.app_hash {
            error!(
                node = %self.node_id,
                height = committed_block.height,
                local = %short_hash(&local_hash),
                agreed = %short_hash(&prev_cert.app_hash),
                "local state diverges from committed app hash"
            );
        }

        self.safety.update_lock(&prev_cert, &committed_block);
        self.state.advance_height(committed_block.height);
        let tip = CommittedTip {
            height: committed_block.height,
            block_hash: prev_cert.block_hash,
            app_hash: prev_cert.app_hash,
        };
        self.store
            .commit_atomically(&committed_block, &prev_cert, &tip)?;
        info!(
            node = %self.node_id,
            height = committed_block.height,
            view = committed_block.view,
            block = %short_hash(&prev_cert.block_hash),
            app_hash = %short_hash(&prev_cert.app_hash),
            "block committed"
        );

        if let Some(tx) = &self.committed_tx {
            let _ = tx.send(CommittedEvent {
                block: committed_block,
                cert: prev_cert,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<N, S, A> ConsensusHandlers for Engine<N, S, A>
where
    N: ConsensusNetwork,
    S: BlockStore,
    A: Application,
{
    async fn handle_propose(&self, propose: Propose) {
        self.on_propose(propose).await;
    }

    async fn handle_prepare(&self, prepare: Prepare) {
        self.on_prepare(prepare).await;
    }
}

/// Nanoseconds since the Unix epoch. Called once per proposal by the
/// leader; the timestamp is a committed field from then on.
fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
