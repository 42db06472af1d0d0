//! Query result rows.
//!
//! # Responsibility
//! - Hold the rows produced by one query, in result order.
//! - Offer typed access to `WeatherEntry` when every column is projected.
//!
//! # Invariants
//! - Rows are read fully before the connection lock is released.
//! - A cursor is consumed once; iteration never restarts.

use crate::contract::{
    COLUMN_ID, COLUMN_LOCATION, COLUMN_NOTES, COLUMN_TEMPERATURE, COLUMN_TIMESTAMP,
};
use crate::model::entry::WeatherEntry;
use crate::model::values::{describe, ValidationError};
use rusqlite::types::Value;
use std::sync::Arc;

/// One result row, addressable by projected column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value of `column`, or `None` when it was not projected.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Real(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Converts a fully projected row into a [`WeatherEntry`].
    ///
    /// # Errors
    /// - `MissingField` when a column was not projected or holds null where
    ///   the table forbids it.
    /// - `InvalidValue` when a column holds an unexpected storage type.
    pub fn to_entry(&self) -> Result<WeatherEntry, ValidationError> {
        let notes = match self.get(COLUMN_NOTES) {
            None => return Err(ValidationError::MissingField(COLUMN_NOTES)),
            Some(Value::Null) => None,
            Some(Value::Text(text)) => Some(text.clone()),
            Some(other) => return Err(invalid(COLUMN_NOTES, other)),
        };

        Ok(WeatherEntry {
            id: self.required(COLUMN_ID, |value| match value {
                Value::Integer(id) => Some(*id),
                _ => None,
            })?,
            location: self.required(COLUMN_LOCATION, |value| match value {
                Value::Text(text) => Some(text.clone()),
                _ => None,
            })?,
            temperature: self.required(COLUMN_TEMPERATURE, |value| match value {
                Value::Real(number) => Some(*number),
                Value::Integer(number) => Some(*number as f64),
                _ => None,
            })?,
            notes,
            timestamp: self.required(COLUMN_TIMESTAMP, |value| match value {
                Value::Integer(timestamp) => Some(*timestamp),
                _ => None,
            })?,
        })
    }

    fn required<T>(
        &self,
        column: &'static str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T, ValidationError> {
        match self.get(column) {
            None | Some(Value::Null) => Err(ValidationError::MissingField(column)),
            Some(value) => convert(value).ok_or_else(|| invalid(column, value)),
        }
    }
}

fn invalid(column: &str, value: &Value) -> ValidationError {
    ValidationError::InvalidValue {
        column: column.to_string(),
        detail: format!("unexpected stored {}", describe(value)),
    }
}

/// Finite, single-pass sequence of query rows.
#[derive(Debug)]
pub struct Cursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Record>,
}

impl Cursor {
    pub(crate) fn new(columns: Arc<[String]>, rows: Vec<Record>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }

    /// Projected column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Drains the remaining rows into typed entries.
    pub fn into_entries(self) -> Result<Vec<WeatherEntry>, ValidationError> {
        self.map(|record| record.to_entry()).collect()
    }
}

impl Iterator for Cursor {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}

#[cfg(test)]
mod tests {
    use super::{Cursor, Record};
    use crate::model::values::ValidationError;
    use rusqlite::types::Value;
    use std::sync::Arc;

    fn columns(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn record_reads_values_by_column_name() {
        let record = Record::new(
            columns(&["id", "location"]),
            vec![Value::Integer(4), Value::Text("Pune".into())],
        );
        assert_eq!(record.get_i64("id"), Some(4));
        assert_eq!(record.get_text("location"), Some("Pune"));
        assert_eq!(record.get("notes"), None);
    }

    #[test]
    fn partial_projection_cannot_become_entry() {
        let record = Record::new(
            columns(&["id", "location"]),
            vec![Value::Integer(1), Value::Text("Pune".into())],
        );
        assert_eq!(
            record.to_entry().unwrap_err(),
            ValidationError::MissingField("notes")
        );
    }

    #[test]
    fn cursor_is_single_pass() {
        let cols = columns(&["id"]);
        let mut cursor = Cursor::new(
            cols.clone(),
            vec![
                Record::new(cols.clone(), vec![Value::Integer(1)]),
                Record::new(cols, vec![Value::Integer(2)]),
            ],
        );
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.next().unwrap().get_i64("id"), Some(1));
        assert_eq!(cursor.len(), 1);
        assert_eq!(cursor.next().unwrap().get_i64("id"), Some(2));
        assert!(cursor.next().is_none());
    }
}
