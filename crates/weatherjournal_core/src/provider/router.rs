//! Resource identifier matching.
//!
//! # Responsibility
//! - Map `scheme://authority/path` identifiers to a resource kind.
//! - Extract the item id from item identifiers.
//!
//! # Invariants
//! - The route table is fixed at construction and never mutated.
//! - Authority and literal segments match exactly (case-sensitive).
//! - A `#` segment matches only ASCII digits that fit in `i64`.
//! - An identifier no route accepts is an error, never an empty result.

use crate::contract::{content_uri, CONTENT_AUTHORITY, PATH_WEATHER};
use crate::model::entry::EntryId;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    UnknownResource { uri: String },
}

impl Display for RouterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownResource { uri } => write!(f, "unknown resource identifier `{uri}`"),
        }
    }
}

impl Error for RouterError {}

/// Recognized identifier shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `.../weather`
    Collection,
    /// `.../weather/{id}`
    Item,
}

/// Result of a successful match, with extracted parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMatch {
    Collection,
    Item { id: EntryId },
}

impl ResourceMatch {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Collection => ResourceKind::Collection,
            Self::Item { .. } => ResourceKind::Item,
        }
    }

    pub fn item_id(&self) -> Option<EntryId> {
        match self {
            Self::Collection => None,
            Self::Item { id } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Number,
}

#[derive(Debug, Clone)]
struct Route {
    authority: String,
    segments: Vec<Segment>,
    kind: ResourceKind,
}

impl Route {
    /// `pattern` is `/`-separated; a `#` segment captures a numeric id.
    fn new(authority: &str, pattern: &str, kind: ResourceKind) -> Self {
        let segments = pattern
            .split('/')
            .map(|segment| match segment {
                "#" => Segment::Number,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        Self {
            authority: authority.to_string(),
            segments,
            kind,
        }
    }

    fn matches(&self, authority: &str, segments: &[&str]) -> Option<ResourceMatch> {
        if self.authority != authority || self.segments.len() != segments.len() {
            return None;
        }

        let mut captured = None;
        for (expected, actual) in self.segments.iter().zip(segments) {
            match expected {
                Segment::Literal(literal) if literal == actual => {}
                Segment::Literal(_) => return None,
                Segment::Number => captured = Some(parse_id(actual)?),
            }
        }

        match (self.kind, captured) {
            (ResourceKind::Collection, _) => Some(ResourceMatch::Collection),
            (ResourceKind::Item, Some(id)) => Some(ResourceMatch::Item { id }),
            (ResourceKind::Item, None) => None,
        }
    }
}

/// Immutable table of `(authority, pattern, kind)` routes.
#[derive(Debug, Clone)]
pub struct ResourceRouter {
    authority: String,
    routes: Vec<Route>,
}

impl ResourceRouter {
    /// Builds the weather routes for `authority`.
    pub fn new(authority: impl Into<String>) -> Self {
        let authority = authority.into();
        let item_pattern = format!("{PATH_WEATHER}/#");
        let routes = vec![
            Route::new(&authority, PATH_WEATHER, ResourceKind::Collection),
            Route::new(&authority, &item_pattern, ResourceKind::Item),
        ];
        Self { authority, routes }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Collection identifier served by this router.
    pub fn collection_uri(&self) -> String {
        content_uri(&self.authority)
    }

    /// Resolves `uri` to a resource kind and its parameters.
    ///
    /// # Errors
    /// - `UnknownResource` when the identifier is malformed or no route matches.
    pub fn match_uri(&self, uri: &str) -> Result<ResourceMatch, RouterError> {
        let unknown = || RouterError::UnknownResource {
            uri: uri.to_string(),
        };

        let (authority, segments) = split_uri(uri).ok_or_else(unknown)?;
        self.routes
            .iter()
            .find_map(|route| route.matches(authority, &segments))
            .ok_or_else(unknown)
    }
}

impl Default for ResourceRouter {
    fn default() -> Self {
        Self::new(CONTENT_AUTHORITY)
    }
}

/// Splits `scheme://authority/a/b` into `("authority", ["a", "b"])`.
///
/// The scheme must be present but its value is not part of matching. A single
/// trailing `/` is ignored; empty segments, queries and fragments are rejected.
fn split_uri(uri: &str) -> Option<(&str, Vec<&str>)> {
    let (scheme, rest) = uri.split_once("://")?;
    if scheme.is_empty() || rest.contains(['?', '#']) {
        return None;
    }

    let (authority, path) = rest.split_once('/')?;
    if authority.is_empty() {
        return None;
    }

    let path = path.strip_suffix('/').unwrap_or(path);
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some((authority, segments))
}

fn parse_id(segment: &str) -> Option<EntryId> {
    if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    segment.parse::<EntryId>().ok()
}
