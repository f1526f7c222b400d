//! Consensus flows over the in-process simulator: pipelined two-chain
//! commits and app-hash divergence handling.

use hl_consensus::{Application, Engine, EngineConfig};
use hl_network::SimNetwork;
use hl_storage::{BlockStore, MemoryStore};
use node_runtime::genesis;
use shared_crypto::sha256;
use shared_types::{Block, Hash, Height};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::support::wait_until;

/// A deterministic stand-in application: the state hash is a function of
/// the block's height and timestamp alone.
struct HashApp;

impl Application for HashApp {
    fn prepare_payload(&self, _parent: &Block, _next_height: Height) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn on_commit(&self, block: &Block) -> Hash {
        let mut preimage = Vec::with_capacity(16);
        preimage.extend_from_slice(&block.height.to_be_bytes());
        preimage.extend_from_slice(&block.timestamp.to_be_bytes());
        sha256(&preimage)
    }
}

/// A Byzantine application: executes like [`HashApp`] but reports a
/// flipped state hash.
struct DivergentApp;

impl Application for DivergentApp {
    fn prepare_payload(&self, _parent: &Block, _next_height: Height) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn on_commit(&self, block: &Block) -> Hash {
        let mut hash = HashApp.on_commit(block);
        for byte in &mut hash {
            *byte = !*byte;
        }
        hash
    }
}

/// Type-erased application so one cluster can mix implementations.
#[derive(Clone)]
struct TestApp(Arc<dyn Application>);

impl Application for TestApp {
    fn prepare_payload(&self, parent: &Block, next_height: Height) -> Vec<Vec<u8>> {
        self.0.prepare_payload(parent, next_height)
    }

    fn on_commit(&self, block: &Block) -> Hash {
        self.0.on_commit(block)
    }
}

struct TestCluster {
    stores: Vec<Arc<MemoryStore>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl TestCluster {
    fn start(apps: Vec<TestApp>) -> Self {
        let identities = genesis::dev_validators(apps.len());
        let validator_set = genesis::validator_set(&identities);
        let network = SimNetwork::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = EngineConfig {
            vote_timeout: Duration::from_secs(1),
            ppc: Duration::from_millis(400),
            delta: Duration::from_millis(100),
        };

        let mut stores = Vec::new();
        let mut tasks = Vec::new();
        for (identity, app) in identities.into_iter().zip(apps) {
            let store = Arc::new(MemoryStore::new());
            let peer = Arc::new(network.join(identity.node_id.clone()));
            let engine = Arc::new(Engine::new(
                identity.node_id.clone(),
                validator_set.clone(),
                identity.bls,
                config.clone(),
                peer,
                store.clone(),
                app,
                None,
                shutdown_rx.clone(),
            ));
            network.register_handlers(identity.node_id.clone(), engine.clone());
            tasks.push(tokio::spawn(engine.run()));
            stores.push(store);
        }

        Self {
            stores,
            shutdown_tx,
            tasks,
        }
    }

    async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            task.abort();
            let _ = task.await;
        }
    }
}

fn tip_height(store: &MemoryStore) -> u64 {
    store
        .committed_tip()
        .expect("store read")
        .map(|t| t.height)
        .unwrap_or(0)
}

#[tokio::test(flavor = "multi_thread")]
async fn honest_cluster_commits_the_same_chain() {
    let cluster = TestCluster::start(
        (0..4).map(|_| TestApp(Arc::new(HashApp))).collect::<Vec<_>>(),
    );

    // Pipelined two-chain: commits trail certificates by one view, so a
    // few views are enough for several heights everywhere.
    let stores = cluster.stores.clone();
    wait_until("all replicas commit height 3", Duration::from_secs(15), || {
        stores.iter().all(|s| tip_height(s) >= 3)
    })
    .await;

    // Safety: every replica that committed height h committed the same
    // block and the same app hash.
    for height in 1..=3u64 {
        // Find the certificate for this height via the committed chain.
        let mut expected: Option<(Hash, Hash)> = None;
        for store in &cluster.stores {
            let tip = store.committed_tip().unwrap().unwrap();
            assert!(tip.height >= 3);
            // Walk parents back from the tip block to the target height.
            let mut block = store.block(&tip.block_hash).unwrap().unwrap();
            let mut app_hash = tip.app_hash;
            while block.height > height {
                let parent = store.block(&block.parent_hash).unwrap().unwrap();
                let parent_cert = store
                    .certificate_by_view(parent.view)
                    .unwrap()
                    .expect("committed parent has a certificate");
                app_hash = parent_cert.app_hash;
                block = parent;
            }
            match &expected {
                None => expected = Some((block.hash(), app_hash)),
                Some((expected_block, expected_app)) => {
                    assert_eq!(*expected_block, block.hash(), "block divergence at {height}");
                    assert_eq!(*expected_app, app_hash, "app-hash divergence at {height}");
                }
            }
        }
    }
    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn dissenting_replica_is_excluded_from_certificates() {
    // Three honest validators and one whose execution diverges.
    let mut apps: Vec<TestApp> = (0..3).map(|_| TestApp(Arc::new(HashApp))).collect();
    apps.push(TestApp(Arc::new(DivergentApp)));
    let cluster = TestCluster::start(apps);

    let stores = cluster.stores.clone();
    wait_until("honest replicas commit height 2", Duration::from_secs(15), || {
        stores[..3].iter().all(|s| tip_height(s) >= 2)
    })
    .await;

    // Every certificate formed excludes the dissenter: its claimed app
    // hash never matches the agreeing quorum.
    let mut checked = 0;
    for view in 1..=8u64 {
        if let Some(cert) = cluster.stores[0].certificate_by_view(view).unwrap() {
            assert!(
                !cert.signers.contains(&"val-4".to_string()),
                "dissenter aggregated into certificate at view {view}"
            );
            assert!(cert.signers.len() >= 3);
            checked += 1;
        }
    }
    assert!(checked >= 2, "expected certificates to inspect");

    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn leaderless_views_time_out_and_the_chain_continues() {
    // A 4-validator set where val-2 never runs: its views time out via
    // the pacemaker and the remaining leaders keep committing.
    let identities = genesis::dev_validators(4);
    let validator_set = genesis::validator_set(&identities);
    let network = SimNetwork::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let config = EngineConfig {
        vote_timeout: Duration::from_millis(400),
        ppc: Duration::from_millis(300),
        delta: Duration::from_millis(100),
    };

    let mut stores = Vec::new();
    let mut tasks = Vec::new();
    for identity in identities {
        let store = Arc::new(MemoryStore::new());
        stores.push(store.clone());
        if identity.node_id == "val-2" {
            // Joined but silent: votes are never sent, proposals never made.
            let _ = network.join(identity.node_id.clone());
            continue;
        }
        let peer = Arc::new(network.join(identity.node_id.clone()));
        let engine = Arc::new(Engine::new(
            identity.node_id.clone(),
            validator_set.clone(),
            identity.bls,
            config.clone(),
            peer,
            store.clone(),
            TestApp(Arc::new(HashApp)),
            None,
            shutdown_rx.clone(),
        ));
        network.register_handlers(identity.node_id.clone(), engine.clone());
        tasks.push(tokio::spawn(engine.run()));
    }

    wait_until(
        "live replicas commit despite the silent leader",
        Duration::from_secs(20),
        || {
            stores
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != 1)
                .all(|(_, s)| tip_height(s) >= 2)
        },
    )
    .await;

    let _ = shutdown_tx.send(true);
    for task in tasks {
        task.abort();
        let _ = task.await;
    }
}
