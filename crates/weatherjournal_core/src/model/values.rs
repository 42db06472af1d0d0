//! Column/value maps passed to insert and update.
//!
//! # Responsibility
//! - Carry caller-supplied column values without committing to a row shape.
//! - Validate and normalize writable columns before they reach SQL.
//!
//! # Invariants
//! - `id` and `timestamp` are store-assigned and never accepted from callers.
//! - A validated `temperature` is always `Value::Real` and finite.
//! - A validated `location` is always non-blank text.

use crate::contract::{
    is_known_column, COLUMN_ID, COLUMN_LOCATION, COLUMN_NOTES, COLUMN_TEMPERATURE,
    COLUMN_TIMESTAMP,
};
use rusqlite::types::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ordered map of column name to SQLite value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentValues {
    values: BTreeMap<String, Value>,
}

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to `value`, replacing any previous value.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn put_text(&mut self, column: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.put(column, Value::Text(value.into()))
    }

    pub fn put_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.put(column, Value::Null)
    }

    /// Builder form of [`ContentValues::put`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(column, value)| (column.as_str(), value))
    }
}

/// Rejection of caller-supplied or persisted column values.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField(&'static str),
    EmptyLocation,
    InvalidTemperature(String),
    InvalidValue { column: String, detail: String },
    ReadOnlyField(String),
    UnknownField(String),
    EmptyValues,
}

impl ValidationError {
    /// Column the error refers to, when there is one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::MissingField(column) => Some(*column),
            Self::EmptyLocation => Some(COLUMN_LOCATION),
            Self::InvalidTemperature(_) => Some(COLUMN_TEMPERATURE),
            Self::InvalidValue { column, .. }
            | Self::ReadOnlyField(column)
            | Self::UnknownField(column) => Some(column.as_str()),
            Self::EmptyValues => None,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(column) => write!(f, "required field `{column}` is missing"),
            Self::EmptyLocation => write!(f, "location must not be empty"),
            Self::InvalidTemperature(detail) => {
                write!(f, "temperature must be a finite number, got {detail}")
            }
            Self::InvalidValue { column, detail } => {
                write!(f, "invalid value for `{column}`: {detail}")
            }
            Self::ReadOnlyField(column) => write!(f, "field `{column}` is assigned by the store"),
            Self::UnknownField(column) => write!(f, "unknown field `{column}`"),
            Self::EmptyValues => write!(f, "no values supplied"),
        }
    }
}

impl Error for ValidationError {}

/// Validates values for a new row and returns the normalized set.
///
/// `location` and `temperature` are required; `notes` is optional.
pub fn validate_insert(values: &ContentValues) -> Result<ContentValues, ValidationError> {
    let normalized = normalize_writable(values)?;
    for required in [COLUMN_LOCATION, COLUMN_TEMPERATURE] {
        match normalized.get(required) {
            None | Some(Value::Null) => return Err(ValidationError::MissingField(required)),
            Some(_) => {}
        }
    }
    Ok(normalized)
}

/// Validates a partial value set for update and returns the normalized set.
pub fn validate_update(values: &ContentValues) -> Result<ContentValues, ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptyValues);
    }
    normalize_writable(values)
}

fn normalize_writable(values: &ContentValues) -> Result<ContentValues, ValidationError> {
    let mut normalized = ContentValues::new();
    for (column, value) in values.iter() {
        if column == COLUMN_ID || column == COLUMN_TIMESTAMP {
            return Err(ValidationError::ReadOnlyField(column.to_string()));
        }
        if !is_known_column(column) {
            return Err(ValidationError::UnknownField(column.to_string()));
        }

        let value = match column {
            COLUMN_LOCATION => normalize_location(value)?,
            COLUMN_TEMPERATURE => normalize_temperature(value)?,
            COLUMN_NOTES => normalize_notes(value)?,
            _ => value.clone(),
        };
        normalized.put(column, value);
    }
    Ok(normalized)
}

fn normalize_location(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Null => Err(ValidationError::MissingField(COLUMN_LOCATION)),
        Value::Text(text) if text.trim().is_empty() => Err(ValidationError::EmptyLocation),
        Value::Text(_) => Ok(value.clone()),
        other => Err(ValidationError::InvalidValue {
            column: COLUMN_LOCATION.to_string(),
            detail: format!("expected text, got {}", describe(other)),
        }),
    }
}

fn normalize_temperature(value: &Value) -> Result<Value, ValidationError> {
    let celsius = match value {
        Value::Null => return Err(ValidationError::MissingField(COLUMN_TEMPERATURE)),
        Value::Integer(number) => *number as f64,
        Value::Real(number) => *number,
        Value::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidTemperature(format!("text `{text}`")))?,
        Value::Blob(_) => return Err(ValidationError::InvalidTemperature("blob".to_string())),
    };

    if !celsius.is_finite() {
        return Err(ValidationError::InvalidTemperature(celsius.to_string()));
    }
    Ok(Value::Real(celsius))
}

fn normalize_notes(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Null | Value::Text(_) => Ok(value.clone()),
        other => Err(ValidationError::InvalidValue {
            column: COLUMN_NOTES.to_string(),
            detail: format!("expected text or null, got {}", describe(other)),
        }),
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}
