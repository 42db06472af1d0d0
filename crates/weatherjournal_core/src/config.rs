//! Store configuration.
//!
//! Plain options struct; callers own where the values come from.

use crate::contract::{CONTENT_AUTHORITY, DATABASE_FILE_NAME};
use crate::db::SCHEMA_VERSION;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    /// Version the opened database is gated on.
    pub schema_version: u32,
    /// Authority the router serves.
    pub authority: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            schema_version: SCHEMA_VERSION,
            authority: CONTENT_AUTHORITY.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store at `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// File-backed store named [`DATABASE_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(DATABASE_FILE_NAME))
    }

    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }
}
