//! Error types for the persistence layer.

use thiserror::Error;

/// Errors raised by the pool, migrations, or the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite-level failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not check a connection out of the pool.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A schema migration failed to apply.
    #[error("migration failed: {message}")]
    Migration {
        /// What went wrong.
        message: String,
    },

    /// The toggle row is absent. The database was never seeded.
    #[error("toggle row missing; database not seeded")]
    StateMissing,

    /// The toggle row exists but one of its columns cannot be decoded.
    #[error("corrupt toggle row: {message}")]
    Corrupt {
        /// Which column, and why it failed to decode.
        message: String,
    },
}

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
