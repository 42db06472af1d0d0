//! Version-gated lifecycle of the `weather` table.
//!
//! # Responsibility
//! - Create the `weather` table on first use.
//! - Drop and recreate it when the stored schema version differs from the
//!   requested one, in either direction.
//!
//! # Invariants
//! - After [`ensure_schema`] succeeds the table matches [`CREATE_WEATHER_TABLE_SQL`]
//!   and `PRAGMA user_version` equals the requested version.
//! - Recreate is destructive: no rows survive a version change.
//! - The check and the recreate run in one immediate transaction.

use super::{storage_location, DbError, DbResult};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) const CREATE_WEATHER_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS weather (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location TEXT NOT NULL,
    temperature REAL NOT NULL,
    notes TEXT,
    timestamp INTEGER NOT NULL
);";

const DROP_WEATHER_TABLE_SQL: &str = "DROP TABLE IF EXISTS weather;";

/// Outcome of a schema check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    /// Fresh database; the table was created.
    Created,
    /// Stored version differed; the table was dropped and recreated.
    Recreated { from: u32 },
    /// Stored version matched and the table was present.
    Unchanged,
}

/// Brings `conn` to `schema_version`, recreating the table on mismatch.
///
/// # Errors
/// - `InvalidSchemaVersion` when `schema_version` is `0`.
/// - `StorageUnavailable` when the medium cannot be read or written.
pub fn ensure_schema(conn: &mut Connection, schema_version: u32) -> DbResult<SchemaAction> {
    if schema_version == 0 {
        return Err(DbError::InvalidSchemaVersion(schema_version));
    }

    let location = storage_location(conn);
    let unavailable = |err| DbError::unavailable(location.as_str(), err);

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(unavailable)?;
    let stored = read_user_version(&tx).map_err(unavailable)?;

    let action = if stored == schema_version {
        if table_exists(&tx).map_err(unavailable)? {
            SchemaAction::Unchanged
        } else {
            warn!(
                "event=schema_check module=db status=repair schema_version={schema_version} reason=table_missing"
            );
            tx.execute_batch(CREATE_WEATHER_TABLE_SQL)
                .map_err(unavailable)?;
            SchemaAction::Created
        }
    } else {
        recreate_table(&tx).map_err(unavailable)?;
        tx.execute_batch(&format!("PRAGMA user_version = {schema_version};"))
            .map_err(unavailable)?;
        if stored == 0 {
            SchemaAction::Created
        } else {
            SchemaAction::Recreated { from: stored }
        }
    };
    tx.commit().map_err(unavailable)?;

    match action {
        SchemaAction::Recreated { from } => info!(
            "event=schema_recreate module=db status=ok from_version={from} to_version={schema_version}"
        ),
        SchemaAction::Created => {
            info!("event=schema_create module=db status=ok schema_version={schema_version}")
        }
        SchemaAction::Unchanged => {}
    }

    Ok(action)
}

/// Reads the schema version stored in the database metadata.
pub fn current_schema_version(conn: &Connection) -> DbResult<u32> {
    read_user_version(conn).map_err(|err| DbError::unavailable(storage_location(conn), err))
}

/// Drops the `weather` table and creates it again from the current definition.
///
/// The caller owns the surrounding transaction.
pub(crate) fn recreate_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(DROP_WEATHER_TABLE_SQL)?;
    conn.execute_batch(CREATE_WEATHER_TABLE_SQL)
}

fn read_user_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
}

fn table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'weather'
        );",
        [],
        |row| row.get::<_, bool>(0),
    )
}
