//! Weather entry domain model.
//!
//! # Responsibility
//! - Define the persisted record and the caller-side draft used for inserts.
//! - Convert drafts into store values through one explicit function.
//!
//! # Invariants
//! - `id` and `timestamp` exist only on persisted entries.
//! - `temperature` is degrees Celsius.

use crate::contract::{COLUMN_LOCATION, COLUMN_NOTES, COLUMN_TEMPERATURE};
use crate::model::values::{validate_insert, ContentValues, ValidationError};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Store-assigned row identifier.
pub type EntryId = i64;

/// One persisted weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherEntry {
    pub id: EntryId,
    pub location: String,
    /// Degrees Celsius.
    pub temperature: f64,
    pub notes: Option<String>,
    /// Unix epoch milliseconds at insert time.
    pub timestamp: i64,
}

/// Caller-side draft of an entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWeatherEntry {
    pub location: String,
    /// Degrees Celsius.
    pub temperature: f64,
    pub notes: Option<String>,
}

impl NewWeatherEntry {
    pub fn new(location: impl Into<String>, temperature: f64) -> Self {
        Self {
            location: location.into(),
            temperature,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Converts the draft into insert values.
    ///
    /// Runs the same validation the store applies, so a draft that converts
    /// cleanly is never rejected on insert for field reasons.
    pub fn to_content_values(&self) -> Result<ContentValues, ValidationError> {
        let mut values = ContentValues::new();
        values
            .put_text(COLUMN_LOCATION, self.location.as_str())
            .put(COLUMN_TEMPERATURE, self.temperature)
            .put(
                COLUMN_NOTES,
                self.notes.clone().map_or(Value::Null, Value::Text),
            );
        validate_insert(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::NewWeatherEntry;
    use crate::model::values::ValidationError;
    use rusqlite::types::Value;

    #[test]
    fn draft_converts_to_normalized_values() {
        let values = NewWeatherEntry::new("Kannur", 28.5)
            .with_notes("Sunny")
            .to_content_values()
            .unwrap();

        assert_eq!(values.get("location"), Some(&Value::Text("Kannur".into())));
        assert_eq!(values.get("temperature"), Some(&Value::Real(28.5)));
        assert_eq!(values.get("notes"), Some(&Value::Text("Sunny".into())));
    }

    #[test]
    fn draft_without_notes_stores_null() {
        let values = NewWeatherEntry::new("Oslo", -3.0).to_content_values().unwrap();
        assert_eq!(values.get("notes"), Some(&Value::Null));
    }

    #[test]
    fn draft_with_empty_location_is_rejected() {
        let err = NewWeatherEntry::new("", 10.0).to_content_values().unwrap_err();
        assert_eq!(err, ValidationError::EmptyLocation);
    }
}
