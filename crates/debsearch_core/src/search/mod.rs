//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose query APIs backed by the FTS5 tables the loaders populate.

pub mod fts;
