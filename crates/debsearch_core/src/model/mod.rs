//! Record shapes shared by the tokenizers, the loader and search.
//!
//! # Responsibility
//! - Define the typed records produced by the ingest pipelines.
//! - Describe which upstream sections feed a merged table.
//!
//! # Invariants
//! - Records are transient: built per parsed block or line and consumed
//!   immediately into a storage row.

pub mod catalog;
pub mod record;
