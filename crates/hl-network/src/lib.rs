//! # Validator Network
//!
//! The consensus engine is written against a four-method network
//! contract (broadcast propose, broadcast prepare, send vote, collect
//! votes) plus handler registration, so the same engine runs over an
//! in-process simulator in tests and a real transport in production.
//! This crate defines the contract and ships the simulator.

pub mod errors;
pub mod ports;
pub mod sim;

pub use errors::NetworkError;
pub use ports::{ConsensusHandlers, ConsensusNetwork};
pub use sim::{SimNetwork, SimPeer};
