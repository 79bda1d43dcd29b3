//! Error types for toggle operations.

use chrono::{DateTime, Utc};
use latch_store::StoreError;
use thiserror::Error;

/// Why a toggle operation failed.
#[derive(Debug, Error)]
pub enum ToggleError {
    /// The cooldown is still running. Carries the state the caller lost
    /// to, so the API layer can echo it back verbatim.
    #[error("toggle locked until {lock_end}")]
    Locked {
        /// The value that is locked in.
        value: bool,
        /// When the cooldown ends.
        lock_end: DateTime<Utc>,
    },

    /// The persistence layer failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience result alias for toggle operations.
pub type Result<T> = std::result::Result<T, ToggleError>;
