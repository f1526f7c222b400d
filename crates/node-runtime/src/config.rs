//! # Node Configuration
//!
//! Unified configuration for the runtime: consensus timing, mempool
//! limits, storage, the typed-data domain and genesis state. Every
//! section has sane defaults; a handful of environment variables
//! override the common knobs.

use hl_markets::Market;
use shared_types::Address;
use std::time::Duration;

/// Complete node (cluster) configuration.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Number of validators in the local cluster.
    pub validators: usize,
    /// Consensus timing.
    pub consensus: ConsensusTimingConfig,
    /// Mempool limits.
    pub mempool: MempoolLimits,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Typed-data domain parameters.
    pub chain_id: u64,
    /// Typed-data verifying contract.
    pub verifying_contract: Address,
    /// Genesis state.
    pub genesis: GenesisConfig,
}

/// Consensus timing parameters.
#[derive(Clone, Debug)]
pub struct ConsensusTimingConfig {
    pub vote_timeout: Duration,
    pub ppc: Duration,
    pub delta: Duration,
}

impl Default for ConsensusTimingConfig {
    fn default() -> Self {
        Self {
            vote_timeout: Duration::from_secs(3),
            ppc: Duration::from_secs(3),
            delta: Duration::from_secs(1),
        }
    }
}

/// Mempool limits.
#[derive(Clone, Debug)]
pub struct MempoolLimits {
    pub capacity: usize,
    pub max_tx_bytes: usize,
    /// Byte budget per proposal payload.
    pub max_payload_bytes: usize,
}

impl Default for MempoolLimits {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            max_tx_bytes: 64 * 1024,
            max_payload_bytes: 1 << 20,
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Data directory for RocksDB. Ignored when `in_memory` is set.
    pub data_dir: String,
    /// Use the in-memory store (tests and local clusters).
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            in_memory: false,
        }
    }
}

/// Genesis state: markets plus initial balances.
#[derive(Clone, Debug, Default)]
pub struct GenesisConfig {
    pub markets: Vec<Market>,
    /// `(address, quote units)` initial balances.
    pub allocations: Vec<(Address, u128)>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            validators: 4,
            consensus: ConsensusTimingConfig::default(),
            mempool: MempoolLimits::default(),
            storage: StorageConfig::default(),
            chain_id: 1337,
            verifying_contract: Address::ZERO,
            genesis: GenesisConfig {
                markets: vec![Market::perpetual("HYPL-USDC", "HYPL", "USDC")],
                allocations: Vec::new(),
            },
        }
    }
}

impl NodeConfig {
    /// Apply environment overrides (`HL_VALIDATORS`, `HL_CHAIN_ID`,
    /// `HL_DATA_DIR`, `HL_IN_MEMORY`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(n) = std::env::var("HL_VALIDATORS") {
            if let Ok(n) = n.parse() {
                config.validators = n;
            }
        }
        if let Ok(id) = std::env::var("HL_CHAIN_ID") {
            if let Ok(id) = id.parse() {
                config.chain_id = id;
            }
        }
        if let Ok(dir) = std::env::var("HL_DATA_DIR") {
            config.storage.data_dir = dir;
        }
        if let Ok(flag) = std::env::var("HL_IN_MEMORY") {
            config.storage.in_memory = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
        config
    }

    /// Reject configurations that cannot form a functioning cluster.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.validators == 0 {
            anyhow::bail!("validator count must be positive");
        }
        let quorum = shared_types::Quorum::for_validators(self.validators);
        if !quorum.is_valid() {
            anyhow::bail!(
                "quorum parameters invalid for {} validators",
                self.validators
            );
        }
        for market in &self.genesis.markets {
            market
                .validate()
                .map_err(|e| anyhow::anyhow!("genesis market invalid: {e}"))?;
        }
        if self.mempool.max_tx_bytes > self.mempool.max_payload_bytes {
            anyhow::bail!("max_tx_bytes exceeds the proposal payload budget");
        }
        Ok(())
    }
}
