//! Resource-oriented access to weather entries.
//!
//! # Responsibility
//! - Route resource identifiers to collection or item operations.
//! - Run CRUD against the `weather` table and notify observers of changes.
//!
//! # Invariants
//! - Every call resolves its identifier before touching storage.
//! - Unmatched identifiers are errors, not empty results.

pub mod cursor;
pub mod error;
pub mod notify;
pub mod router;
pub mod selection;
pub mod store;

pub use cursor::{Cursor, Record};
pub use error::{Operation, StoreError, StoreResult};
pub use notify::{ChangeEvent, ChangeNotifier, ChangeObserver, ObserverId, Subscription};
pub use router::{ResourceKind, ResourceMatch, ResourceRouter, RouterError};
pub use selection::Selection;
pub use store::{ResourceProvider, WeatherStore};
