//! # Shared Types Crate
//!
//! This crate contains the domain entities shared across the validator's
//! subsystems: hashes, addresses, validator identity, consensus objects
//! (blocks, votes, certificates) and the peer-to-peer message shapes.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Deterministic Hashing**: `Block::hash()` is a pure function of the
//!   committed fields, byte-for-byte identical on every replica.
//! - **No Floating Point**: every quantity that can reach consensus state is
//!   an integer.

pub mod consensus;
pub mod primitives;
pub mod records;

pub use consensus::*;
pub use primitives::*;
pub use records::*;
