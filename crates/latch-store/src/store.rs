//! Durable access to the single toggle row.

use chrono::{DateTime, Utc};
use latch_core::ToggleState;
use rusqlite::{params, OptionalExtension};

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::{Result, StoreError};

/// Reads and writes the one `toggle_state` row.
///
/// The store is a thin mapping layer. Serializing concurrent toggles is
/// the runtime's job, not the store's.
#[derive(Clone)]
pub struct StateStore {
    pool: ConnectionPool,
}

impl StateStore {
    /// Wrap a migrated connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Insert the initial record if the table is empty, then return
    /// whatever is stored. Existing state is never overwritten, so a
    /// restart keeps the previous value and lock.
    pub fn ensure_seeded(&self, now: DateTime<Utc>) -> Result<ToggleState> {
        let conn = self.pool.get()?;
        let initial = ToggleState::initial(now);
        let _ = conn.execute(
            "INSERT OR IGNORE INTO toggle_state (id, value, last_change, locked, lock_end)
             VALUES (1, ?1, ?2, ?3, NULL)",
            params![initial.value, initial.last_change.to_rfc3339(), initial.locked],
        )?;
        read_row(&conn)
    }

    /// Read the current record.
    pub fn read_state(&self) -> Result<ToggleState> {
        let conn = self.pool.get()?;
        read_row(&conn)
    }

    /// Overwrite the record with `state`.
    pub fn write_state(&self, state: &ToggleState) -> Result<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE toggle_state
             SET value = ?1, last_change = ?2, locked = ?3, lock_end = ?4
             WHERE id = 1",
            params![
                state.value,
                state.last_change.to_rfc3339(),
                state.locked,
                state.lock_end.map(|end| end.to_rfc3339()),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::StateMissing);
        }
        Ok(())
    }
}

fn read_row(conn: &PooledConnection) -> Result<ToggleState> {
    let row = conn
        .query_row(
            "SELECT value, last_change, locked, lock_end FROM toggle_state WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((value, last_change, locked, lock_end)) = row else {
        return Err(StoreError::StateMissing);
    };

    Ok(ToggleState {
        value,
        last_change: parse_timestamp("last_change", &last_change)?,
        locked,
        lock_end: lock_end
            .map(|raw| parse_timestamp("lock_end", &raw))
            .transpose()?,
    })
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt {
            message: format!("{column} is not an RFC 3339 timestamp ({raw}): {err}"),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
