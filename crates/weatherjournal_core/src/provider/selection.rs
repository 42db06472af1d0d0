//! Row filters passed to query, update and delete.
//!
//! A selection is a SQL boolean expression over `weather` columns using
//! anonymous `?` placeholders, plus the values bound to them in order.

use crate::contract::COLUMN_ID;
use crate::model::entry::EntryId;
use rusqlite::types::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    clause: Option<String>,
    args: Vec<Value>,
}

impl Selection {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filters by `clause` with `args` bound to its `?` placeholders.
    ///
    /// A blank clause matches every row and its args are dropped.
    pub fn new<I, V>(clause: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let clause = clause.into();
        if clause.trim().is_empty() {
            return Self::all();
        }
        Self {
            clause: Some(clause),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Narrows to one row by id.
    pub fn by_id(id: EntryId) -> Self {
        Self {
            clause: Some(format!("{COLUMN_ID} = ?")),
            args: vec![Value::Integer(id)],
        }
    }

    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// ` WHERE (...)` fragment, or an empty string for [`Selection::all`].
    pub(crate) fn where_sql(&self) -> String {
        match &self.clause {
            Some(clause) => format!(" WHERE ({clause})"),
            None => String::new(),
        }
    }
}
