//! Coordinated shutdown for the server and its background tasks.

use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the root cancellation token that every long-running task watches.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    root: CancellationToken,
}

impl ShutdownCoordinator {
    /// New coordinator with an untriggered token.
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
        }
    }

    /// A token that trips when shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Begin shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Trigger shutdown and wait for `handles` to finish, up to
    /// `timeout` (30 seconds when `None`).
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        self.shutdown();
        let limit = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        match tokio::time::timeout(limit, join_all(handles)).await {
            Ok(results) => {
                let panicked = results.iter().filter(|result| result.is_err()).count();
                if panicked > 0 {
                    warn!(panicked, "background tasks ended abnormally during shutdown");
                } else {
                    info!("all background tasks drained");
                }
            }
            Err(_) => {
                warn!(
                    timeout_secs = limit.as_secs(),
                    "shutdown timed out waiting for background tasks"
                );
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
