//! # Execution Pipeline
//!
//! Applies a block's ordered transactions to the order books and the
//! account ledger, and derives the `AppHash` that consensus votes on.
//!
//! The application of a payload is a pure function of
//! `(payload, height, timestamp, prior state)`: no wall clock, no
//! randomness, no unordered iteration, no floating point. Invalid
//! transactions are dropped with no state effect; the block's hash
//! reflects successful transactions only.

pub mod app;
pub mod errors;
pub mod hash;

pub use app::{App, AppConfig, OrderEvent};
pub use errors::ExecError;
pub use hash::compute_app_hash;
