//! # latch-store
//!
//! SQLite persistence for the toggle:
//! - r2d2 connection pool with WAL and busy-timeout pragmas
//! - versioned schema migrations applied at startup
//! - [`StateStore`] — seed, read, and overwrite the single toggle row

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod store;

pub use connection::{
    new_file, new_in_memory, verify_pragmas, ConnectionConfig, ConnectionPool, PooledConnection,
};
pub use errors::{Result, StoreError};
pub use migrations::{current_version, latest_version, run_migrations};
pub use store::StateStore;
