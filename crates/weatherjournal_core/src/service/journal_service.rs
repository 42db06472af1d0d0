//! Weather journal use-case service.
//!
//! # Responsibility
//! - Record, list, read, annotate and remove entries with typed values.
//! - Bridge the current-weather collaborator to the store without display strings.
//!
//! # Invariants
//! - Every call goes through `ResourceProvider`; nothing touches SQL directly.
//! - Item operations address `<collection>/<id>` identifiers.

use crate::contract::{with_appended_id, COLUMN_LOCATION, COLUMN_NOTES};
use crate::model::entry::{EntryId, NewWeatherEntry, WeatherEntry};
use crate::model::values::ContentValues;
use crate::provider::{Cursor, Operation, ResourceProvider, Selection, StoreError, StoreResult};
use crate::weather::{CurrentWeatherSource, WeatherSourceError};
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure of a flow that spans the weather source and the store.
#[derive(Debug)]
pub enum JournalError {
    Weather(WeatherSourceError),
    Store(StoreError),
}

impl Display for JournalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weather(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for JournalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Weather(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<WeatherSourceError> for JournalError {
    fn from(value: WeatherSourceError) -> Self {
        Self::Weather(value)
    }
}

impl From<StoreError> for JournalError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Typed journal operations over a resource provider.
pub struct JournalService<'p, P: ResourceProvider> {
    provider: &'p P,
}

impl<'p, P: ResourceProvider> JournalService<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self { provider }
    }

    /// Stores a draft and returns the new item identifier.
    pub fn record(&self, entry: &NewWeatherEntry) -> StoreResult<String> {
        let uri = self.provider.collection_uri();
        let values = entry
            .to_content_values()
            .map_err(|err| StoreError::constraint(Operation::Insert, &uri, err))?;
        self.provider.insert(&uri, &values)
    }

    /// Fetches current conditions for `location` and stores them with `notes`.
    ///
    /// The collaborator's Kelvin reading is converted to Celsius before insert.
    pub fn record_current_weather(
        &self,
        source: &impl CurrentWeatherSource,
        location: &str,
        api_key: &str,
        notes: Option<String>,
    ) -> Result<String, JournalError> {
        let weather = source.current_weather(location, api_key)?;
        Ok(self.record(&weather.to_new_entry(notes))?)
    }

    pub fn get(&self, id: EntryId) -> StoreResult<Option<WeatherEntry>> {
        let uri = self.item_uri(id);
        let cursor = self
            .provider
            .query(&uri, None, &Selection::all(), None)?;
        Ok(to_entries(&uri, cursor)?.into_iter().next())
    }

    /// All entries in storage (insertion) order.
    pub fn history(&self) -> StoreResult<Vec<WeatherEntry>> {
        self.list(&Selection::all())
    }

    /// Entries for `location` (case-insensitive), in storage order.
    pub fn find_by_location(&self, location: &str) -> StoreResult<Vec<WeatherEntry>> {
        self.list(&Selection::new(
            format!("{COLUMN_LOCATION} = ? COLLATE NOCASE"),
            [Value::Text(location.to_string())],
        ))
    }

    pub fn count(&self) -> StoreResult<usize> {
        let uri = self.provider.collection_uri();
        let cursor = self
            .provider
            .query(&uri, Some(&["id"][..]), &Selection::all(), None)?;
        Ok(cursor.len())
    }

    /// Replaces the notes of one entry. Returns `false` when it does not exist.
    pub fn update_notes(&self, id: EntryId, notes: Option<&str>) -> StoreResult<bool> {
        let mut values = ContentValues::new();
        match notes {
            Some(notes) => values.put_text(COLUMN_NOTES, notes),
            None => values.put_null(COLUMN_NOTES),
        };
        let changed = self
            .provider
            .update(&self.item_uri(id), &values, &Selection::all())?;
        Ok(changed > 0)
    }

    /// Deletes one entry. Returns `false` when it did not exist.
    pub fn remove(&self, id: EntryId) -> StoreResult<bool> {
        let changed = self
            .provider
            .delete(&self.item_uri(id), &Selection::all())?;
        Ok(changed > 0)
    }

    /// Deletes every entry and returns how many were removed.
    pub fn clear(&self) -> StoreResult<usize> {
        self.provider
            .delete(&self.provider.collection_uri(), &Selection::all())
    }

    fn list(&self, selection: &Selection) -> StoreResult<Vec<WeatherEntry>> {
        let uri = self.provider.collection_uri();
        let cursor = self.provider.query(&uri, None, selection, None)?;
        to_entries(&uri, cursor)
    }

    fn item_uri(&self, id: EntryId) -> String {
        with_appended_id(&self.provider.collection_uri(), id)
    }
}

fn to_entries(uri: &str, cursor: Cursor) -> StoreResult<Vec<WeatherEntry>> {
    cursor.into_entries().map_err(|source| StoreError::InvalidData {
        uri: uri.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::JournalService;
    use crate::config::StoreConfig;
    use crate::model::entry::NewWeatherEntry;
    use crate::provider::{StoreError, WeatherStore};

    #[test]
    fn record_rejects_blank_location_before_insert() {
        let store = WeatherStore::open(&StoreConfig::in_memory()).unwrap();
        let service = JournalService::new(&store);

        let err = service
            .record(&NewWeatherEntry::new("  ", 12.0))
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn missing_entry_reads_as_none_and_removes_as_false() {
        let store = WeatherStore::open(&StoreConfig::in_memory()).unwrap();
        let service = JournalService::new(&store);

        assert_eq!(service.get(99).unwrap(), None);
        assert!(!service.remove(99).unwrap());
        assert!(!service.update_notes(99, Some("nothing here")).unwrap());
    }
}
