//! Package and contents records.
//!
//! # Invariants
//! - `PackageRecord` always carries non-empty-key `name`, `version` and
//!   `description`; blocks missing any of them never become a record.
//! - One contents line with N owners expands into N `ContentRecord`s sharing
//!   the same `filename`.

use serde::{Deserialize, Serialize};

/// One binary package entry from a `Packages` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Value of the `Package` field.
    pub name: String,
    pub version: String,
    /// First line of the `Description` field.
    pub description: String,
    /// Catalog section label (`main`, `universe`, ...) the record came from.
    pub source: Option<String>,
}

impl PackageRecord {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            source: None,
        }
    }

    /// Tags this record with the catalog section it was read from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// One (file, owning package) pair from a `Contents` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub filename: String,
    /// Owner token as written upstream, usually `section/package`.
    pub package: String,
}

impl ContentRecord {
    pub fn new(filename: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            package: package.into(),
        }
    }
}
