//! Liveness probing for observer sockets.
//!
//! The session keeps a per-connection heartbeat task running alongside the
//! read loop. The outbound half of the session sends the actual Ping frames;
//! this task only watches the liveness flag that inbound traffic refreshes
//! and decides when a silent peer should be considered gone.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::websocket::connection::ObserverConnection;

/// Why a heartbeat task finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The peer stayed silent for longer than the configured timeout.
    TimedOut,
    /// The surrounding session was torn down first.
    Cancelled,
}

/// Watches `connection` for signs of life until the peer goes quiet.
///
/// Every `interval` tick the liveness flag is consumed; a connection that
/// fails to refresh it for `timeout` worth of consecutive ticks is reported
/// as [`HeartbeatResult::TimedOut`] so the session can drop it.
pub async fn run_heartbeat(
    connection: Arc<ObserverConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let interval_secs = interval.as_secs().max(1);
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_secs() / interval_secs).max(1) as u32;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so the peer gets a full
    // interval before the first liveness check.
    let _ = ticker.tick().await;

    let mut missed: u32 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    debug!(
                        id = %connection.id,
                        missed,
                        max_missed,
                        "observer missed a heartbeat"
                    );
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
