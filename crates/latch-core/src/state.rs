//! The toggle record and its client-facing projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;

/// The durable toggle record. Exactly one of these exists, shared by
/// every client of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    /// Current boolean value of the toggle.
    pub value: bool,
    /// When the value last flipped.
    pub last_change: DateTime<Utc>,
    /// Whether a cooldown lock is recorded.
    pub locked: bool,
    /// When the recorded lock expires, if any.
    pub lock_end: Option<DateTime<Utc>>,
}

impl ToggleState {
    /// Record for a fresh database: off, never flipped, unlocked.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            value: false,
            last_change: now,
            locked: false,
            lock_end: None,
        }
    }
}

/// Client-facing view of the toggle, serialized with the field names the
/// HTTP API and WebSocket frames use.
///
/// A recorded lock whose deadline has already passed is projected as
/// unlocked, so clients never see a stale `lockEnd` even if the stored
/// record has not been cleaned up yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// The toggle value.
    pub is_checked: bool,
    /// Whether the cooldown is currently in effect.
    pub is_locked: bool,
    /// When the cooldown ends. `None` whenever `is_locked` is false.
    pub lock_end: Option<DateTime<Utc>>,
}

impl StateSnapshot {
    /// Project the stored record as seen at `now`.
    pub fn project(state: &ToggleState, now: DateTime<Utc>) -> Self {
        match clock::active_lock_end(state, now) {
            Some(end) => Self {
                is_checked: state.value,
                is_locked: true,
                lock_end: Some(end),
            },
            None => Self {
                is_checked: state.value,
                is_locked: false,
                lock_end: None,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
