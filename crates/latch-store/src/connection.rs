//! SQLite connection pooling.
//!
//! Every connection runs the same pragma batch when the pool acquires it:
//! WAL journaling plus a busy timeout, so a reader never hard-fails just
//! because a write happens to be in flight.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of SQLite connections.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of the pool.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Tuning knobs for the connection pool.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = {};
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

/// Open a pool backed by a database file, creating the file if missing.
pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path);
    build_pool(manager, config, config.pool_size)
}

/// Open a pool backed by an in-memory database.
///
/// A `memory()` manager gives every connection its own private database,
/// so this pool is capped at a single connection. Use [`new_file`] when a
/// test or caller needs concurrent access.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::memory();
    build_pool(manager, config, 1)
}

fn build_pool(
    manager: SqliteConnectionManager,
    config: &ConnectionConfig,
    size: u32,
) -> Result<ConnectionPool> {
    let pool = Pool::builder()
        .max_size(size)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}

/// The pragma values that matter, read back from a live connection.
#[derive(Debug)]
pub struct PragmaState {
    /// Active journal mode (`wal` on disk, `memory` for in-memory DBs).
    pub journal_mode: String,
    /// Synchronous level (1 = NORMAL).
    pub synchronous: i64,
}

/// Read the effective pragma values, for startup logging and tests.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    let synchronous: i64 = conn.query_row("PRAGMA synchronous", [], |row| row.get(0))?;
    Ok(PragmaState {
        journal_mode,
        synchronous,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
