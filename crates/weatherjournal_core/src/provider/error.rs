//! Error taxonomy of the resource-oriented store.
//!
//! # Invariants
//! - Every variant names the resource identifier it was raised for.
//! - Zero rows affected is a result, never one of these errors.

use crate::db::DbError;
use crate::model::values::ValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

type BoxedSource = Box<dyn Error + Send + Sync + 'static>;

/// Store entry point an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Query,
    Insert,
    Update,
    Delete,
    TypeOf,
    Reset,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Query => "query",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::TypeOf => "type_of",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// Medium missing, unreadable, corrupted, locked or full.
    StorageUnavailable {
        operation: Operation,
        uri: String,
        source: BoxedSource,
    },
    /// No route matches the identifier.
    UnknownResource { operation: Operation, uri: String },
    /// The identifier is known but the operation is not defined for its kind.
    UnsupportedOperation { operation: Operation, uri: String },
    /// A written value broke a field rule or a table constraint.
    ConstraintViolation {
        operation: Operation,
        uri: String,
        source: BoxedSource,
    },
    /// A projected or sorted column does not exist.
    InvalidProjection { uri: String, column: String },
    /// A sort directive is not `column [ASC|DESC]` separated by commas.
    InvalidSortOrder { uri: String, directive: String },
    /// A stored row does not convert into a `WeatherEntry`.
    InvalidData {
        uri: String,
        source: ValidationError,
    },
    /// Requested schema version is not usable.
    InvalidSchemaVersion(u32),
    /// Engine error outside the categories above, e.g. a malformed filter.
    Sqlite {
        operation: Operation,
        uri: String,
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Resource identifier the failing call addressed.
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::StorageUnavailable { uri, .. }
            | Self::UnknownResource { uri, .. }
            | Self::UnsupportedOperation { uri, .. }
            | Self::ConstraintViolation { uri, .. }
            | Self::InvalidProjection { uri, .. }
            | Self::InvalidSortOrder { uri, .. }
            | Self::InvalidData { uri, .. }
            | Self::Sqlite { uri, .. } => Some(uri.as_str()),
            Self::InvalidSchemaVersion(_) => None,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::StorageUnavailable { operation, .. }
            | Self::UnknownResource { operation, .. }
            | Self::UnsupportedOperation { operation, .. }
            | Self::ConstraintViolation { operation, .. }
            | Self::Sqlite { operation, .. } => Some(*operation),
            Self::InvalidProjection { .. }
            | Self::InvalidSortOrder { .. }
            | Self::InvalidData { .. } => Some(Operation::Query),
            Self::InvalidSchemaVersion(_) => Some(Operation::Open),
        }
    }

    /// Field rule behind a `ConstraintViolation`, when it came from validation.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::ConstraintViolation { source, .. } => source.downcast_ref::<ValidationError>(),
            _ => None,
        }
    }

    pub(crate) fn constraint(operation: Operation, uri: &str, source: ValidationError) -> Self {
        Self::ConstraintViolation {
            operation,
            uri: uri.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn from_db(operation: Operation, uri: &str, err: DbError) -> Self {
        match err {
            DbError::InvalidSchemaVersion(version) => Self::InvalidSchemaVersion(version),
            storage @ DbError::StorageUnavailable { .. } => Self::StorageUnavailable {
                operation,
                uri: uri.to_string(),
                source: Box::new(storage),
            },
        }
    }

    /// Sorts an engine error into the taxonomy by its extended result code.
    pub(crate) fn from_sqlite(operation: Operation, uri: &str, err: rusqlite::Error) -> Self {
        let uri = uri.to_string();
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation {
                operation,
                uri,
                source: Box::new(err),
            },
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::FileLockingProtocolFailed,
            ) => Self::StorageUnavailable {
                operation,
                uri,
                source: Box::new(err),
            },
            _ => Self::Sqlite {
                operation,
                uri,
                source: err,
            },
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable {
                operation,
                uri,
                source,
            } => write!(f, "{operation} `{uri}`: storage unavailable: {source}"),
            Self::UnknownResource { operation, uri } => {
                write!(f, "{operation} `{uri}`: unknown resource")
            }
            Self::UnsupportedOperation { operation, uri } => {
                write!(f, "{operation} `{uri}`: operation not supported for this resource")
            }
            Self::ConstraintViolation {
                operation,
                uri,
                source,
            } => write!(f, "{operation} `{uri}`: constraint violation: {source}"),
            Self::InvalidProjection { uri, column } => {
                write!(f, "query `{uri}`: unknown column `{column}`")
            }
            Self::InvalidSortOrder { uri, directive } => {
                write!(f, "query `{uri}`: invalid sort order `{directive}`")
            }
            Self::InvalidData { uri, source } => {
                write!(f, "query `{uri}`: invalid stored entry: {source}")
            }
            Self::InvalidSchemaVersion(version) => {
                write!(f, "schema version must be at least 1, got {version}")
            }
            Self::Sqlite {
                operation,
                uri,
                source,
            } => write!(f, "{operation} `{uri}`: {source}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable { source, .. } | Self::ConstraintViolation { source, .. } => {
                Some(source.as_ref())
            }
            Self::Sqlite { source, .. } => Some(source),
            Self::InvalidData { source, .. } => Some(source),
            Self::UnknownResource { .. }
            | Self::UnsupportedOperation { .. }
            | Self::InvalidProjection { .. }
            | Self::InvalidSortOrder { .. }
            | Self::InvalidSchemaVersion(_) => None,
        }
    }
}
