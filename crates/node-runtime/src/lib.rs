//! # HyperLicked Node Runtime
//!
//! Configuration, genesis construction and wiring for the validator:
//! storage, application, network and the consensus engine are assembled
//! here. The binary runs a local cluster over the in-process network
//! simulator; a production transport plugs in behind the same
//! `ConsensusNetwork` contract.

pub mod adapters;
pub mod config;
pub mod genesis;
pub mod node;

pub use adapters::AppBridge;
pub use config::{ConsensusTimingConfig, GenesisConfig, NodeConfig, StorageConfig};
pub use node::{Cluster, ValidatorHandle};
