//! Pump between the controller's publish channel and connected observers.
//!
//! The controller publishes [`StateSnapshot`] values on a broadcast channel
//! without knowing anything about sockets. The bridge subscribes to that
//! channel, wraps each snapshot in the wire frame, and hands it to the
//! [`BroadcastManager`] for fan-out.

use std::sync::Arc;

use latch_core::StateSnapshot;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::StateUpdate;

/// Forwards state changes from the controller to every observer socket.
pub struct StateBridge {
    rx: broadcast::Receiver<StateSnapshot>,
    broadcast: Arc<BroadcastManager>,
}

impl StateBridge {
    /// Builds a bridge from a controller subscription and the fan-out manager.
    pub fn new(rx: broadcast::Receiver<StateSnapshot>, broadcast: Arc<BroadcastManager>) -> Self {
        Self { rx, broadcast }
    }

    /// Runs until the controller side of the channel is dropped.
    ///
    /// A lagged receiver skips ahead rather than stopping: observers only
    /// care about the latest state, and the next update supersedes whatever
    /// was missed.
    #[tracing::instrument(skip_all, name = "state_bridge")]
    pub async fn run(mut self) {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => {
                    let delivered = self.broadcast.broadcast_all(&StateUpdate::new(snapshot)).await;
                    debug!(delivered, "state update fanned out");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "state bridge lagged behind the publish channel");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("publish channel closed, state bridge stopping");
                    break;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
