//! The application bridge.

use shared_types::{Block, Hash, Height};

/// The two operations the application exposes to the engine.
pub trait Application: Send + Sync {
    /// Select up to a byte budget of ordered transactions for the next
    /// proposal, in the mempool's fixed priority order.
    fn prepare_payload(&self, parent: &Block, next_height: Height) -> Vec<Vec<u8>>;

    /// Apply the block's payload deterministically and return the
    /// resulting application state hash. Must be idempotent when
    /// re-executing a block known to have produced the same hash.
    fn on_commit(&self, block: &Block) -> Hash;
}
