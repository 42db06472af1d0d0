//! Resource-oriented record store over the `weather` table.
//!
//! # Responsibility
//! - Resolve identifiers through the router and run the matching SQL.
//! - Validate written values before they reach SQL.
//! - Publish change notifications after successful mutations.
//!
//! # Invariants
//! - One connection, owned by the store and guarded by one mutex; every
//!   operation (reads included) and schema recreate serialize on it.
//! - Item identifiers always narrow to `id = <itemId>`; caller filters are
//!   discarded for them.
//! - Notifications fire after commit and after the connection lock is
//!   released, before the call returns. A delivery turn reserved under the
//!   lock keeps them in write order.
//! - Every operation is one self-contained transaction, so a lock poisoned by
//!   a panicking holder is recovered rather than surfaced.
//! - Inserts notify on the collection identifier; update/delete notify on the
//!   identifier as given and only when rows changed.

use crate::config::StoreConfig;
use crate::contract::{
    collection_type, is_known_column, item_type, with_appended_id, ALL_COLUMNS,
    COLUMN_TIMESTAMP, TABLE_WEATHER,
};
use crate::db::schema::recreate_table;
use crate::db::{current_schema_version, open_db_in_memory_with_version, open_db_with_version};
use crate::model::values::{validate_insert, validate_update, ContentValues};
use crate::provider::cursor::{Cursor, Record};
use crate::provider::error::{Operation, StoreError, StoreResult};
use crate::provider::notify::ChangeNotifier;
use crate::provider::router::{ResourceMatch, ResourceRouter};
use crate::provider::selection::Selection;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

static SORT_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s+(?i:(asc|desc)))?\s*$")
        .expect("valid sort term regex")
});

/// Resource-oriented CRUD contract consumed by services and presentation code.
pub trait ResourceProvider {
    /// Identifier of the entry collection this provider serves.
    fn collection_uri(&self) -> String;
    fn query(
        &self,
        uri: &str,
        projection: Option<&[&str]>,
        selection: &Selection,
        sort_order: Option<&str>,
    ) -> StoreResult<Cursor>;
    fn insert(&self, uri: &str, values: &ContentValues) -> StoreResult<String>;
    fn update(
        &self,
        uri: &str,
        values: &ContentValues,
        selection: &Selection,
    ) -> StoreResult<usize>;
    fn delete(&self, uri: &str, selection: &Selection) -> StoreResult<usize>;
    fn type_of(&self, uri: &str) -> StoreResult<String>;
}

/// SQLite-backed store addressed by resource identifiers.
pub struct WeatherStore {
    conn: Mutex<Connection>,
    router: Arc<ResourceRouter>,
    notifier: ChangeNotifier,
}

impl WeatherStore {
    /// Opens the database described by `config` and builds its router.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the medium cannot be opened or read.
    /// - `InvalidSchemaVersion` when `config.schema_version` is `0`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let router = Arc::new(ResourceRouter::new(config.authority.as_str()));
        let opened = match &config.db_path {
            Some(path) => open_db_with_version(path, config.schema_version),
            None => open_db_in_memory_with_version(config.schema_version),
        };
        let conn = opened
            .map_err(|err| StoreError::from_db(Operation::Open, &router.collection_uri(), err))?;
        Ok(Self::from_connection(conn, router))
    }

    /// Wraps an already schema-checked connection.
    pub fn from_connection(conn: Connection, router: Arc<ResourceRouter>) -> Self {
        Self {
            conn: Mutex::new(conn),
            router,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn collection_uri(&self) -> String {
        self.router.collection_uri()
    }

    /// Registry observers use to follow changes.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Schema version stored in the open database.
    pub fn schema_version(&self) -> StoreResult<u32> {
        let uri = self.collection_uri();
        let conn = self.lock();
        current_schema_version(&conn).map_err(|err| StoreError::from_db(Operation::Open, &uri, err))
    }

    /// Returns the rows addressed by `uri`.
    ///
    /// `projection = None` (or empty) selects every column in table order.
    /// Without `sort_order` rows come back in storage (id) order.
    ///
    /// # Errors
    /// - `UnknownResource` when `uri` matches no route.
    /// - `InvalidProjection` when a projected or sorted column does not exist.
    /// - `InvalidSortOrder` when `sort_order` is malformed.
    pub fn query(
        &self,
        uri: &str,
        projection: Option<&[&str]>,
        selection: &Selection,
        sort_order: Option<&str>,
    ) -> StoreResult<Cursor> {
        let op = Operation::Query;
        let selection = self.effective_selection(op, uri, selection)?;
        let columns = project(uri, projection)?;
        let order_by = order_by(uri, sort_order)?;

        let sql = format!(
            "SELECT {} FROM {TABLE_WEATHER}{} ORDER BY {order_by};",
            columns.join(", "),
            selection.where_sql()
        );

        let conn = self.lock();
        let records = read_records(&conn, &sql, &selection, &columns)
            .map_err(|err| StoreError::from_sqlite(op, uri, err))?;
        debug!(
            "event=entry_query module=provider status=ok rows={}",
            records.len()
        );
        Ok(Cursor::new(columns, records))
    }

    /// Inserts one entry into the collection at `uri`.
    ///
    /// Returns the new item identifier (`<uri>/<id>`). The store assigns `id`
    /// and `timestamp`.
    ///
    /// # Errors
    /// - `UnsupportedOperation` when `uri` addresses an item.
    /// - `ConstraintViolation` when a required field is missing or invalid;
    ///   nothing is written.
    pub fn insert(&self, uri: &str, values: &ContentValues) -> StoreResult<String> {
        let op = Operation::Insert;
        match self.resolve(op, uri)? {
            ResourceMatch::Collection => {}
            ResourceMatch::Item { .. } => return Err(unsupported(op, uri)),
        }
        let values = validate_insert(values).map_err(|err| StoreError::constraint(op, uri, err))?;

        let mut columns: Vec<&str> = values.iter().map(|(column, _)| column).collect();
        let mut binds: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
        columns.push(COLUMN_TIMESTAMP);
        binds.push(Value::Integer(now_epoch_ms()));

        let sql = format!(
            "INSERT INTO {TABLE_WEATHER} ({}) VALUES ({});",
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let mut conn = self.lock();
        let id = insert_row(&mut conn, &sql, binds)
            .map_err(|err| StoreError::from_sqlite(op, uri, err))?;
        let ticket = self.notifier.reserve();
        drop(conn);

        info!("event=entry_insert module=provider status=ok id={id}");
        ticket.notify(uri);

        Ok(with_appended_id(uri, id))
    }

    /// Updates the rows addressed by `uri` and `selection`.
    ///
    /// Returns the number of rows changed; `0` is not an error.
    pub fn update(
        &self,
        uri: &str,
        values: &ContentValues,
        selection: &Selection,
    ) -> StoreResult<usize> {
        let op = Operation::Update;
        let selection = self.effective_selection(op, uri, selection)?;
        let values = validate_update(values).map_err(|err| StoreError::constraint(op, uri, err))?;

        let assignments: Vec<String> = values
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect();
        let binds: Vec<Value> = values
            .iter()
            .map(|(_, value)| value.clone())
            .chain(selection.args().iter().cloned())
            .collect();
        let sql = format!(
            "UPDATE {TABLE_WEATHER} SET {}{};",
            assignments.join(", "),
            selection.where_sql()
        );

        self.mutate(op, uri, &sql, binds)
    }

    /// Deletes the rows addressed by `uri` and `selection`.
    ///
    /// Returns the number of rows removed; `0` is not an error.
    pub fn delete(&self, uri: &str, selection: &Selection) -> StoreResult<usize> {
        let op = Operation::Delete;
        let selection = self.effective_selection(op, uri, selection)?;
        let sql = format!("DELETE FROM {TABLE_WEATHER}{};", selection.where_sql());
        self.mutate(op, uri, &sql, selection.args().to_vec())
    }

    /// MIME-like type tag for the resource kind of `uri`.
    pub fn type_of(&self, uri: &str) -> StoreResult<String> {
        let authority = self.router.authority();
        Ok(match self.resolve(Operation::TypeOf, uri)? {
            ResourceMatch::Collection => collection_type(authority),
            ResourceMatch::Item { .. } => item_type(authority),
        })
    }

    /// Drops and recreates the `weather` table, discarding every row.
    ///
    /// Returns the number of rows dropped and notifies on the collection.
    pub fn reset(&self) -> StoreResult<usize> {
        let op = Operation::Reset;
        let uri = self.collection_uri();
        let mut conn = self.lock();
        let dropped = drop_all_rows(&mut conn)
            .map_err(|err| StoreError::from_sqlite(op, &uri, err))?;
        let ticket = self.notifier.reserve();
        drop(conn);

        info!("event=table_reset module=provider status=ok dropped_rows={dropped}");
        ticket.notify(&uri);

        Ok(usize::try_from(dropped).unwrap_or_default())
    }

    fn mutate(&self, op: Operation, uri: &str, sql: &str, binds: Vec<Value>) -> StoreResult<usize> {
        let mut conn = self.lock();
        let changed = execute_in_transaction(&mut conn, sql, binds)
            .map_err(|err| StoreError::from_sqlite(op, uri, err))?;
        let ticket = (changed > 0).then(|| self.notifier.reserve());
        drop(conn);

        info!("event=entry_{op} module=provider status=ok rows={changed}");
        if let Some(ticket) = ticket {
            ticket.notify(uri);
        }

        Ok(changed)
    }

    fn resolve(&self, op: Operation, uri: &str) -> StoreResult<ResourceMatch> {
        self.router
            .match_uri(uri)
            .map_err(|_| StoreError::UnknownResource {
                operation: op,
                uri: uri.to_string(),
            })
    }

    /// Caller selection for collections, `id = <itemId>` for items.
    fn effective_selection(
        &self,
        op: Operation,
        uri: &str,
        selection: &Selection,
    ) -> StoreResult<Selection> {
        match self.resolve(op, uri)? {
            ResourceMatch::Collection => Ok(selection.clone()),
            ResourceMatch::Item { id } => {
                if selection.clause().is_some() {
                    debug!("event=selection_override module=provider status=ok operation={op}");
                }
                Ok(Selection::by_id(id))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=connection_lock module=provider status=recovered reason=poisoned");
            poisoned.into_inner()
        })
    }
}

impl ResourceProvider for WeatherStore {
    fn collection_uri(&self) -> String {
        WeatherStore::collection_uri(self)
    }

    fn query(
        &self,
        uri: &str,
        projection: Option<&[&str]>,
        selection: &Selection,
        sort_order: Option<&str>,
    ) -> StoreResult<Cursor> {
        WeatherStore::query(self, uri, projection, selection, sort_order)
    }

    fn insert(&self, uri: &str, values: &ContentValues) -> StoreResult<String> {
        WeatherStore::insert(self, uri, values)
    }

    fn update(
        &self,
        uri: &str,
        values: &ContentValues,
        selection: &Selection,
    ) -> StoreResult<usize> {
        WeatherStore::update(self, uri, values, selection)
    }

    fn delete(&self, uri: &str, selection: &Selection) -> StoreResult<usize> {
        WeatherStore::delete(self, uri, selection)
    }

    fn type_of(&self, uri: &str) -> StoreResult<String> {
        WeatherStore::type_of(self, uri)
    }
}

fn unsupported(op: Operation, uri: &str) -> StoreError {
    StoreError::UnsupportedOperation {
        operation: op,
        uri: uri.to_string(),
    }
}

fn project(uri: &str, projection: Option<&[&str]>) -> StoreResult<Arc<[String]>> {
    let requested = match projection {
        Some(columns) if !columns.is_empty() => columns,
        _ => ALL_COLUMNS,
    };
    requested
        .iter()
        .map(|column| {
            if is_known_column(column) {
                Ok(column.to_string())
            } else {
                Err(StoreError::InvalidProjection {
                    uri: uri.to_string(),
                    column: column.to_string(),
                })
            }
        })
        .collect()
}

/// Normalizes `column [ASC|DESC], ...` into an `ORDER BY` body.
fn order_by(uri: &str, sort_order: Option<&str>) -> StoreResult<String> {
    let directive = match sort_order {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ => return Ok("rowid".to_string()),
    };

    let mut terms = Vec::new();
    for term in directive.split(',') {
        let captures = SORT_TERM_RE
            .captures(term)
            .ok_or_else(|| StoreError::InvalidSortOrder {
                uri: uri.to_string(),
                directive: directive.to_string(),
            })?;
        let column = &captures[1];
        if !is_known_column(column) {
            return Err(StoreError::InvalidProjection {
                uri: uri.to_string(),
                column: column.to_string(),
            });
        }
        let direction = match captures.get(2) {
            Some(direction) if direction.as_str().eq_ignore_ascii_case("desc") => " DESC",
            Some(_) => " ASC",
            None => "",
        };
        terms.push(format!("{column}{direction}"));
    }
    Ok(terms.join(", "))
}

fn insert_row(conn: &mut Connection, sql: &str, binds: Vec<Value>) -> rusqlite::Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(sql, params_from_iter(binds))?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

fn execute_in_transaction(
    conn: &mut Connection,
    sql: &str,
    binds: Vec<Value>,
) -> rusqlite::Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let changed = tx.execute(sql, params_from_iter(binds))?;
    tx.commit()?;
    Ok(changed)
}

fn drop_all_rows(conn: &mut Connection) -> rusqlite::Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let dropped: i64 = tx.query_row(
        &format!("SELECT COUNT(*) FROM {TABLE_WEATHER};"),
        [],
        |row| row.get(0),
    )?;
    recreate_table(&tx)?;
    tx.commit()?;
    Ok(dropped)
}

fn read_records(
    conn: &Connection,
    sql: &str,
    selection: &Selection,
    columns: &Arc<[String]>,
) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(selection.args()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|index| row.get::<_, Value>(index))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        records.push(Record::new(Arc::clone(columns), values));
    }
    Ok(records)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::order_by;
    use crate::provider::error::StoreError;

    const URI: &str = "content://com.example.weatherjournal/weather";

    #[test]
    fn order_by_defaults_to_storage_order() {
        assert_eq!(order_by(URI, None).unwrap(), "rowid");
        assert_eq!(order_by(URI, Some("  ")).unwrap(), "rowid");
    }

    #[test]
    fn order_by_normalizes_terms() {
        assert_eq!(
            order_by(URI, Some("timestamp desc, location")).unwrap(),
            "timestamp DESC, location"
        );
        assert_eq!(order_by(URI, Some("id Asc")).unwrap(), "id ASC");
    }

    #[test]
    fn order_by_rejects_unknown_columns_and_injection() {
        assert!(matches!(
            order_by(URI, Some("humidity DESC")).unwrap_err(),
            StoreError::InvalidProjection { column, .. } if column == "humidity"
        ));
        assert!(matches!(
            order_by(URI, Some("id; DROP TABLE weather")).unwrap_err(),
            StoreError::InvalidSortOrder { .. }
        ));
        assert!(matches!(
            order_by(URI, Some("id,")).unwrap_err(),
            StoreError::InvalidSortOrder { .. }
        ));
    }
}
