//! Epoch-guarded lock expiry timers.
//!
//! One timer is spawned per armed lock. The timer sleeps until the lock
//! deadline, then asks the controller to clear the lock for its epoch.
//! If a newer flip armed a fresh lock in the meantime the clear is
//! refused, so a delayed timer can never unlock a cooldown it does not
//! own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::controller::{ClearOutcome, Shared};

/// Terminal state of one expiry timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpiryResult {
    /// The deadline passed and the lock was cleared.
    Cleared,
    /// A newer flip owned the lock; this timer stood down.
    Superseded,
    /// Shutdown cancelled the timer before the deadline.
    Cancelled,
    /// The store rejected the clear.
    Failed,
}

/// Sleep until `lock_end`, then clear the lock armed at `epoch`.
pub(crate) async fn run_expiry(
    shared: Arc<Shared>,
    epoch: u64,
    lock_end: DateTime<Utc>,
    cancel: CancellationToken,
) -> ExpiryResult {
    let wait = (lock_end - Utc::now()).to_std().unwrap_or(Duration::ZERO);

    tokio::select! {
        () = tokio::time::sleep(wait) => {}
        () = cancel.cancelled() => {
            return ExpiryResult::Cancelled;
        }
    }

    match shared.clear_lock(epoch) {
        Ok(ClearOutcome::Cleared) => {
            info!(epoch, "cooldown expired, toggle unlocked");
            ExpiryResult::Cleared
        }
        Ok(ClearOutcome::Superseded) => ExpiryResult::Superseded,
        Err(err) => {
            warn!(epoch, %err, "failed to clear expired lock");
            ExpiryResult::Failed
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
