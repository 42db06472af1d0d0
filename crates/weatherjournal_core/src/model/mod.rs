//! Domain model for weather journal entries.
//!
//! # Responsibility
//! - Define the typed entry shapes used by services and callers.
//! - Define the untyped column/value map used by the resource-oriented store.
//!
//! # Invariants
//! - Every persisted entry has a store-assigned `id` and `timestamp`.
//! - `location` and `temperature` are never absent on a persisted entry.

pub mod entry;
pub mod values;
