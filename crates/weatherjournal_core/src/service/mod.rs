//! Journal use-case services.
//!
//! # Responsibility
//! - Offer typed entry operations on top of the resource-oriented provider.
//! - Keep presentation callers away from identifiers and column maps.

pub mod journal_service;
