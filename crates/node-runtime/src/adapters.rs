//! Adapters between the application and the consensus ports.

use hl_app::App;
use hl_consensus::Application;
use shared_types::{Block, Hash, Height};
use std::sync::Arc;

/// Exposes the application's bridge operations to the engine.
#[derive(Clone)]
pub struct AppBridge(pub Arc<App>);

impl Application for AppBridge {
    fn prepare_payload(&self, parent: &Block, next_height: Height) -> Vec<Vec<u8>> {
        self.0.prepare_payload(parent, next_height)
    }

    fn on_commit(&self, block: &Block) -> Hash {
        self.0.on_commit(block)
    }
}
