//! Core storage logic for the weather journal.
//! Entries are addressed by resource identifiers and persisted in SQLite;
//! this crate owns every data invariant, presentation layers only call in.

pub mod config;
pub mod contract;
pub mod db;
pub mod logging;
pub mod model;
pub mod provider;
pub mod service;
pub mod weather;

pub use config::StoreConfig;
pub use logging::{
    default_log_level, init_logging, logging_status, LogLevel, LoggingConfig, LoggingError,
};
pub use model::entry::{EntryId, NewWeatherEntry, WeatherEntry};
pub use model::values::{ContentValues, ValidationError};
pub use provider::{
    ChangeEvent, ChangeNotifier, ChangeObserver, Cursor, ObserverId, Operation, Record,
    ResourceKind, ResourceMatch, ResourceProvider, ResourceRouter, Selection, StoreError,
    StoreResult, Subscription, WeatherStore,
};
pub use service::journal_service::{JournalError, JournalService};
pub use weather::{
    format_for_display, kelvin_to_celsius, CurrentWeather, CurrentWeatherSource,
    WeatherSourceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
