//! Cooldown arithmetic for the toggle lock.
//!
//! Lock comparisons are strict: a deadline exactly equal to `now` counts
//! as expired, so the instant the cooldown elapses the toggle is usable.

use chrono::{DateTime, TimeDelta, Utc};

use crate::state::ToggleState;

/// How long the toggle stays locked after each flip, in seconds.
pub const COOLDOWN_SECS: i64 = 60;

/// The standard cooldown window as a [`TimeDelta`].
pub fn default_cooldown() -> TimeDelta {
    TimeDelta::seconds(COOLDOWN_SECS)
}

/// Deadline for a lock armed at `now`.
pub fn arm(now: DateTime<Utc>, cooldown: TimeDelta) -> DateTime<Utc> {
    now + cooldown
}

/// The lock deadline, if a lock is recorded and still in the future.
pub fn active_lock_end(state: &ToggleState, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !state.locked {
        return None;
    }
    state.lock_end.filter(|end| now < *end)
}

/// Whether the toggle is still inside its cooldown window at `now`.
pub fn lock_active(state: &ToggleState, now: DateTime<Utc>) -> bool {
    active_lock_end(state, now).is_some()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
