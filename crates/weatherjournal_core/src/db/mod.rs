//! SQLite storage bootstrap and schema lifecycle entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the weather journal.
//! - Create the `weather` table and recreate it when the schema version changes.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No entry data is read or written before the schema check succeeds.
//! - Any failure to reach or read the medium surfaces as `StorageUnavailable`.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory, open_db_in_memory_with_version, open_db_with_version};
pub use schema::{current_schema_version, ensure_schema, SchemaAction, SCHEMA_VERSION};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The backing file is missing, unreadable, locked or not a database.
    StorageUnavailable {
        location: String,
        source: rusqlite::Error,
    },
    /// `0` is reserved by SQLite for "no schema yet".
    InvalidSchemaVersion(u32),
}

impl DbError {
    pub(crate) fn unavailable(location: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::StorageUnavailable {
            location: location.into(),
            source,
        }
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable { location, source } => {
                write!(f, "storage unavailable at `{location}`: {source}")
            }
            Self::InvalidSchemaVersion(version) => {
                write!(f, "schema version must be at least 1, got {version}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable { source, .. } => Some(source),
            Self::InvalidSchemaVersion(_) => None,
        }
    }
}

/// Human-readable location of a connection's backing store.
pub(crate) fn storage_location(conn: &Connection) -> String {
    match conn.path() {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => ":memory:".to_string(),
    }
}
