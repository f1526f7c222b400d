//! # Block Store
//!
//! Persistence for the validator: blocks by hash, certificates by view,
//! the committed-tip singleton, and committed application records
//! (accounts, open orders, trades). Two adapters implement the store
//! trait: a RocksDB adapter for production and an in-memory adapter for
//! tests.
//!
//! Store failures are fatal-visible: callers treat any `StoreError` as a
//! reason to halt rather than continue on divergent state.

pub mod errors;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod store;

pub use errors::StoreError;
pub use memory::MemoryStore;
pub use rocks::{RocksDbConfig, RocksDbStore};
pub use store::BlockStore;
