//! # Consensus Engine
//!
//! HotStuff-style two-chain BFT with pipelined execution: replicas
//! execute a proposal BEFORE voting and carry the resulting application
//! state hash inside their votes, so a certificate attests both the
//! block AND the state it produces.
//!
//! The engine is defined against the network contract in `hl-network`
//! and the `Application` bridge in [`ports`], so the same state machine
//! runs over the in-process simulator in tests and a real transport in
//! production.

pub mod elector;
pub mod engine;
pub mod errors;
pub mod pacemaker;
pub mod ports;
pub mod safety;
pub mod state;

pub use elector::RoundRobinElector;
pub use engine::{CommittedEvent, Engine, EngineConfig};
pub use errors::ConsensusError;
pub use pacemaker::Pacemaker;
pub use ports::Application;
pub use safety::SafetyModule;
pub use state::NodeState;
