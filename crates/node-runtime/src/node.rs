//! Cluster wiring.
//!
//! Assembles storage, application, network endpoint and engine for each
//! validator and runs them over the in-process simulator. The same
//! wiring backs the binary's local cluster and the integration tests.

use crate::adapters::AppBridge;
use crate::config::NodeConfig;
use crate::genesis;
use hl_app::{App, AppConfig, OrderEvent};
use hl_codec::DelegationRegistry;
use hl_consensus::{CommittedEvent, Engine, EngineConfig};
use hl_mempool::{Mempool, MempoolConfig};
use hl_network::{SimNetwork, SimPeer};
use hl_storage::{BlockStore, MemoryStore, RocksDbConfig, RocksDbStore};
use shared_types::NodeId;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

type ClusterEngine = Engine<SimPeer, Arc<dyn BlockStore>, AppBridge>;

/// One running validator.
pub struct ValidatorHandle {
    pub node_id: NodeId,
    pub app: Arc<App>,
    pub mempool: Arc<Mempool>,
    pub store: Arc<dyn BlockStore>,
    pub engine: Arc<ClusterEngine>,
    engine_task: JoinHandle<()>,
    persist_task: JoinHandle<()>,
}

/// A local validator cluster over the simulated network.
pub struct Cluster {
    pub network: SimNetwork,
    pub validators: Vec<ValidatorHandle>,
    shutdown_tx: watch::Sender<bool>,
}

impl Cluster {
    /// Build and start a cluster per the configuration.
    pub fn start(config: &NodeConfig) -> anyhow::Result<Cluster> {
        config.validate()?;
        let identities = genesis::dev_validators(config.validators);
        let validator_set = genesis::validator_set(&identities);
        let network = SimNetwork::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut validators = Vec::with_capacity(identities.len());
        for identity in identities {
            let node_id = identity.node_id.clone();

            let registry = genesis::build_registry(config)?;
            let mempool = Arc::new(Mempool::new(MempoolConfig {
                capacity: config.mempool.capacity,
                max_tx_bytes: config.mempool.max_tx_bytes,
            }));
            let app = Arc::new(App::new(
                AppConfig {
                    chain_id: config.chain_id,
                    verifying_contract: config.verifying_contract,
                    max_payload_bytes: config.mempool.max_payload_bytes,
                },
                registry,
                Arc::new(DelegationRegistry::new()),
                mempool.clone(),
            ));
            genesis::apply_allocations(config, &app);

            let store: Arc<dyn BlockStore> = if config.storage.in_memory {
                Arc::new(MemoryStore::new())
            } else {
                let path = format!("{}/{}", config.storage.data_dir, node_id);
                Arc::new(RocksDbStore::open(RocksDbConfig {
                    path,
                    ..RocksDbConfig::default()
                })?)
            };

            let peer = Arc::new(network.join(node_id.clone()));
            let (committed_tx, committed_rx) = mpsc::unbounded_channel();
            let engine = Arc::new(Engine::new(
                node_id.clone(),
                validator_set.clone(),
                identity.bls,
                EngineConfig {
                    vote_timeout: config.consensus.vote_timeout,
                    ppc: config.consensus.ppc,
                    delta: config.consensus.delta,
                },
                peer,
                store.clone(),
                AppBridge(app.clone()),
                Some(committed_tx),
                shutdown_rx.clone(),
            ));
            network.register_handlers(node_id.clone(), engine.clone());

            let engine_task = tokio::spawn(engine.clone().run());
            let persist_task =
                tokio::spawn(persist_commits(app.clone(), store.clone(), committed_rx));

            validators.push(ValidatorHandle {
                node_id,
                app,
                mempool,
                store,
                engine,
                engine_task,
                persist_task,
            });
        }

        info!(validators = validators.len(), "cluster started");
        Ok(Cluster {
            network,
            validators,
            shutdown_tx,
        })
    }

    /// Submit a raw client transaction to every validator's mempool
    /// (gossip stand-in for the local cluster).
    pub fn submit(&self, raw: &[u8]) {
        for validator in &self.validators {
            if let Err(err) = validator.mempool.push(raw) {
                warn!(node = %validator.node_id, error = %err, "mempool rejected transaction");
            }
        }
    }

    /// Stop every validator and wait for the tasks to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for validator in self.validators {
            validator.engine_task.abort();
            validator.persist_task.abort();
            let _ = validator.engine_task.await;
            let _ = validator.persist_task.await;
        }
        info!("cluster stopped");
    }
}

/// Persist the application records of each committed block: trades, and
/// the accounts they touched.
async fn persist_commits(
    app: Arc<App>,
    store: Arc<dyn BlockStore>,
    mut committed_rx: mpsc::UnboundedReceiver<CommittedEvent>,
) {
    while let Some(committed) = committed_rx.recv().await {
        for trade in app.drain_trades() {
            if let Err(err) = store.put_trade(&trade) {
                warn!(height = committed.block.height, error = %err, "trade persistence failed");
                continue;
            }
            for addr in [trade.taker, trade.maker] {
                if let Some(account) = app.account(&addr) {
                    if let Err(err) = store.put_account(&account) {
                        warn!(error = %err, "account persistence failed");
                    }
                }
            }
        }
        for event in app.drain_order_events() {
            let result = match &event {
                OrderEvent::Rested(order) => store.put_order(order),
                OrderEvent::Removed { owner, order_id } => store.delete_order(owner, *order_id),
            };
            if let Err(err) = result {
                warn!(error = %err, "order persistence failed");
            }
        }
    }
}
