//! Ingest of Debian/Ubuntu repository metadata into SQLite full-text tables.
//!
//! Two pipelines share one architecture: fetch, tokenize the record stream,
//! normalize records into rows, then bulk-load a full-text table with
//! full-replace semantics.

pub mod db;
pub mod fetch;
pub mod load;
pub mod logging;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod search;

pub use fetch::{AutoSource, FetchError, FileSource, HttpSource, IndexSource};
pub use load::{BulkLoader, FtsRow, LoadError, LoadResult, LoadSession, TableSchema};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::{contents_url, SourceCatalog, SourceCatalogEntry};
pub use model::record::{ContentRecord, PackageRecord};
pub use parse::{
    normalize_block, ContentEntries, MalformedLine, NormalizeError, PackageBlock, PackageBlocks,
    ParseError, ParsePolicy,
};
pub use pipeline::{load_contents, load_packages, IngestError, IngestResult, LoadReport, SectionReport};
pub use search::fts::{search_files, search_packages, SearchError, SearchQuery, SearchResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
