//! Shared node state.

use parking_lot::RwLock;
use shared_types::{Block, Certificate, Height, View};

/// The mutable consensus state shared by the engine, safety module and
/// pacemaker: current view, committed height, highest certificate and
/// the locked block/certificate pair.
#[derive(Debug, Default)]
pub struct NodeState {
    view: RwLock<View>,
    height: RwLock<Height>,
    highest_cert: RwLock<Option<Certificate>>,
    locked: RwLock<Option<(Block, Certificate)>>,
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        *self.view.read()
    }

    /// Monotone view advance.
    pub fn advance_view(&self, view: View) {
        let mut current = self.view.write();
        if view > *current {
            *current = view;
        }
    }

    pub fn height(&self) -> Height {
        *self.height.read()
    }

    /// Monotone height advance.
    pub fn advance_height(&self, height: Height) {
        let mut current = self.height.write();
        if height > *current {
            *current = height;
        }
    }

    pub fn highest_cert(&self) -> Option<Certificate> {
        self.highest_cert.read().clone()
    }

    pub fn set_highest_cert(&self, cert: Certificate) {
        *self.highest_cert.write() = Some(cert);
    }

    pub fn locked(&self) -> Option<(Block, Certificate)> {
        self.locked.read().clone()
    }

    pub fn set_locked(&self, block: Block, cert: Certificate) {
        *self.locked.write() = Some((block, cert));
    }
}
