//! Serialized toggle mutation and state publishing.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use latch_core::{clock, StateSnapshot, ToggleState};
use latch_store::{StateStore, StoreError};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{Result, ToggleError};
use crate::expiry;

/// How many snapshots the publish channel buffers before slow
/// subscribers start lagging.
const PUBLISH_CAPACITY: usize = 64;

/// The single owner of toggle mutations.
///
/// Every flip goes through [`attempt_toggle`](Self::attempt_toggle),
/// which holds the mutation lock across its read-check-write sequence.
/// Of any set of concurrent callers exactly one wins the flip; the rest
/// observe the freshly armed cooldown. Cloning is cheap and every clone
/// drives the same toggle.
#[derive(Clone)]
pub struct ToggleController {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) store: StateStore,
    pub(crate) cooldown: TimeDelta,
    mutation: Mutex<MutationState>,
    tx: broadcast::Sender<StateSnapshot>,
    cancel: CancellationToken,
}

struct MutationState {
    /// Bumped every time a lock is armed. Expiry timers carry the epoch
    /// they were spawned under and refuse to clear any newer lock.
    epoch: u64,
}

/// What happened when an expiry timer tried to clear its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClearOutcome {
    /// The lock from this timer's epoch was cleared.
    Cleared,
    /// A newer flip armed a fresh lock first; nothing was touched.
    Superseded,
}

impl ToggleController {
    /// Create a controller over a seeded store.
    pub fn new(store: StateStore, cooldown: TimeDelta) -> Self {
        let (tx, _) = broadcast::channel(PUBLISH_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                store,
                cooldown,
                mutation: Mutex::new(MutationState { epoch: 0 }),
                tx,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Subscribe to state changes. Every accepted flip and every lock
    /// expiry publishes a snapshot here, in commit order.
    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Current state as clients should see it.
    pub fn snapshot(&self) -> Result<StateSnapshot> {
        let state = self.shared.store.read_state()?;
        Ok(StateSnapshot::project(&state, Utc::now()))
    }

    /// Flip the toggle and arm the cooldown lock.
    ///
    /// Refused with [`ToggleError::Locked`] while a previous cooldown is
    /// still running. Must be called inside a Tokio runtime; each
    /// accepted flip spawns the timer that later unlocks it.
    pub fn attempt_toggle(&self, now: DateTime<Utc>) -> Result<StateSnapshot> {
        let shared = &self.shared;
        let mut mutation = shared.mutation.lock();

        let state = shared.store.read_state()?;
        if let Some(end) = clock::active_lock_end(&state, now) {
            debug!(lock_end = %end, "toggle refused, cooldown active");
            return Err(ToggleError::Locked {
                value: state.value,
                lock_end: end,
            });
        }

        let lock_end = clock::arm(now, shared.cooldown);
        let next = ToggleState {
            value: !state.value,
            last_change: now,
            locked: true,
            lock_end: Some(lock_end),
        };
        shared.store.write_state(&next)?;

        mutation.epoch += 1;
        drop(tokio::spawn(expiry::run_expiry(
            Arc::clone(shared),
            mutation.epoch,
            lock_end,
            shared.cancel.child_token(),
        )));

        info!(value = next.value, lock_end = %lock_end, "toggle flipped");

        // Published while the mutation lock is held, so subscribers see
        // flips in commit order.
        let snapshot = StateSnapshot::project(&next, now);
        shared.publish(&snapshot);
        Ok(snapshot)
    }

    /// Reconcile persisted lock state after a restart.
    ///
    /// A lock that is still running gets a fresh expiry timer. A lock
    /// whose deadline passed while the service was down is cleared and
    /// written back. Returns the re-armed deadline, if any.
    pub fn resume(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let shared = &self.shared;
        let mut mutation = shared.mutation.lock();

        let state = shared.store.read_state()?;
        if !state.locked && state.lock_end.is_none() {
            return Ok(None);
        }

        if let Some(end) = clock::active_lock_end(&state, now) {
            mutation.epoch += 1;
            info!(lock_end = %end, "re-armed persisted lock");
            drop(tokio::spawn(expiry::run_expiry(
                Arc::clone(shared),
                mutation.epoch,
                end,
                shared.cancel.child_token(),
            )));
            return Ok(Some(end));
        }

        let cleared = ToggleState {
            locked: false,
            lock_end: None,
            ..state
        };
        shared.store.write_state(&cleared)?;
        info!("cleared lock that expired while the service was down");
        Ok(None)
    }

    /// Cancel every outstanding expiry timer. Used at shutdown.
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Shared {
    /// Clear the lock armed at `epoch` and publish the unlocked state.
    /// A newer flip bumps the epoch, in which case nothing is touched.
    pub(crate) fn clear_lock(&self, epoch: u64) -> std::result::Result<ClearOutcome, StoreError> {
        let mutation = self.mutation.lock();
        if mutation.epoch != epoch {
            return Ok(ClearOutcome::Superseded);
        }

        let state = self.store.read_state()?;
        let cleared = ToggleState {
            locked: false,
            lock_end: None,
            ..state
        };
        self.store.write_state(&cleared)?;

        let snapshot = StateSnapshot::project(&cleared, Utc::now());
        self.publish(&snapshot);
        Ok(ClearOutcome::Cleared)
    }

    pub(crate) fn publish(&self, snapshot: &StateSnapshot) {
        if self.tx.send(snapshot.clone()).is_err() {
            debug!("state update published with no subscribers");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
