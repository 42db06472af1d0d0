//! Public naming contract shared by the store and its callers.
//!
//! # Responsibility
//! - Define the authority, paths and resource identifiers callers address.
//! - Define table/column names and the MIME-like type tags.
//!
//! # Invariants
//! - Column names here are the only names accepted in projections, values
//!   and sort directives.
//! - Item identifiers are always `<collection identifier>/<id>`.

/// URI scheme used by every resource identifier.
pub const CONTENT_SCHEME: &str = "content";
/// Default authority registered by [`crate::provider::ResourceRouter`].
pub const CONTENT_AUTHORITY: &str = "com.example.weatherjournal";
/// Path segment addressing the weather entry collection.
pub const PATH_WEATHER: &str = "weather";

/// Default on-disk database file name.
pub const DATABASE_FILE_NAME: &str = "weather.db";

pub const TABLE_WEATHER: &str = "weather";

pub const COLUMN_ID: &str = "id";
pub const COLUMN_LOCATION: &str = "location";
pub const COLUMN_TEMPERATURE: &str = "temperature";
pub const COLUMN_NOTES: &str = "notes";
pub const COLUMN_TIMESTAMP: &str = "timestamp";

/// All columns of the `weather` table in declaration order.
pub const ALL_COLUMNS: &[&str] = &[
    COLUMN_ID,
    COLUMN_LOCATION,
    COLUMN_TEMPERATURE,
    COLUMN_NOTES,
    COLUMN_TIMESTAMP,
];

const DIR_TYPE_PREFIX: &str = "vnd.weatherjournal.dir";
const ITEM_TYPE_PREFIX: &str = "vnd.weatherjournal.item";

/// Returns whether `name` is a column of the `weather` table.
pub fn is_known_column(name: &str) -> bool {
    ALL_COLUMNS.contains(&name)
}

/// Builds the collection identifier for `authority`.
///
/// `content_uri("com.example.weatherjournal")` returns
/// `content://com.example.weatherjournal/weather`.
pub fn content_uri(authority: &str) -> String {
    format!("{CONTENT_SCHEME}://{authority}/{PATH_WEATHER}")
}

/// Appends an item id to a collection identifier.
pub fn with_appended_id(collection_uri: &str, id: i64) -> String {
    format!("{}/{id}", collection_uri.trim_end_matches('/'))
}

/// Type tag for a directory of weather entries.
pub fn collection_type(authority: &str) -> String {
    format!("{DIR_TYPE_PREFIX}/{authority}/{PATH_WEATHER}")
}

/// Type tag for a single weather entry.
pub fn item_type(authority: &str) -> String {
    format!("{ITEM_TYPE_PREFIX}/{authority}/{PATH_WEATHER}")
}
