//! View pacing.
//!
//! Followers park here until the leader's prepare advances the view, or
//! until the `ppc + delta` budget expires. The timeout path advances the
//! view unconditionally; it stands in for a full view-change
//! sub-protocol, which this design intentionally leaves out, at a known
//! cost to liveness under adversarial delays.

use crate::state::NodeState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

/// Buffered capacity of the view-advance channel. A full channel drops
/// the signal; the waiter still times out or sees a later signal.
const SIGNAL_BUFFER: usize = 64;

/// The pacemaker: reactive wake-ups plus a hard per-view timeout.
pub struct Pacemaker {
    state: Arc<NodeState>,
    /// Proposal-plus-commit budget.
    ppc: Duration,
    /// Network delay allowance on top of `ppc`.
    delta: Duration,
    signal_tx: mpsc::Sender<u64>,
    signal_rx: Mutex<mpsc::Receiver<u64>>,
}

impl Pacemaker {
    pub fn new(state: Arc<NodeState>, ppc: Duration, delta: Duration) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        Self {
            state,
            ppc,
            delta,
            signal_tx,
            signal_rx: Mutex::new(signal_rx),
        }
    }

    /// Non-blocking publish of an observed view (from prepare events).
    pub fn signal_view_advance(&self, view: u64) {
        if self.signal_tx.try_send(view).is_err() {
            trace!(view, "view signal dropped (channel full)");
        }
    }

    /// Park until a prepare for some view >= `target_view` is observed,
    /// or the `ppc + delta` budget expires. Either way the node's view
    /// has advanced to at least `target_view` on return, keeping the main
    /// loop monotone.
    pub async fn wait_for_view_advance(&self, target_view: u64) {
        // Fast path: the highest certificate already justifies the target.
        if let Some(cert) = self.state.highest_cert() {
            if cert.view + 1 >= target_view {
                self.state.advance_view(target_view);
                return;
            }
        }

        let deadline = Instant::now() + self.ppc + self.delta;
        let mut rx = self.signal_rx.lock().await;
        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(view)) if view >= target_view => {
                    self.state.advance_view(target_view);
                    return;
                }
                Ok(Some(_)) => continue,
                // Channel closed or budget expired: advance unconditionally.
                Ok(None) | Err(_) => {
                    debug!(target_view, "view advance timed out");
                    self.state.advance_view(target_view);
                    return;
                }
            }
        }
    }
}
