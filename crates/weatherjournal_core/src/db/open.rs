//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the store.
//! - Run the schema check before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have a busy timeout configured.
//! - Returned connections carry the requested schema version.

use super::schema::{ensure_schema, SCHEMA_VERSION};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a database file at the current [`SCHEMA_VERSION`].
///
/// # Side effects
/// - Creates the file and the `weather` table on first use.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_version(path, SCHEMA_VERSION)
}

/// Opens a database file and gates it on `schema_version`.
///
/// A stored version different from `schema_version` drops and recreates the
/// `weather` table; existing rows are lost.
pub fn open_db_with_version(path: impl AsRef<Path>, schema_version: u32) -> DbResult<Connection> {
    let path = path.as_ref();
    let location = path.display().to_string();
    open_logged("file", &location, schema_version, || Connection::open(path))
}

/// Opens an in-memory database at the current [`SCHEMA_VERSION`].
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_in_memory_with_version(SCHEMA_VERSION)
}

pub fn open_db_in_memory_with_version(schema_version: u32) -> DbResult<Connection> {
    open_logged("memory", ":memory:", schema_version, Connection::open_in_memory)
}

fn open_logged(
    mode: &str,
    location: &str,
    schema_version: u32,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode} schema_version={schema_version}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(DbError::unavailable(location, err));
        }
    };

    match bootstrap_connection(&mut conn, location, schema_version) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, location: &str, schema_version: u32) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|err| DbError::unavailable(location, err))?;
    ensure_schema(conn, schema_version)?;
    Ok(())
}
