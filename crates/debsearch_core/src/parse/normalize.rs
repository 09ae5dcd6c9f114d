//! Package block normalization.
//!
//! # Invariants
//! - Required fields are looked up explicitly; a missing one is a typed
//!   `NormalizeError`, never a panic and never an empty default.
//! - Fields other than the required ones are ignored.

use super::packages::PackageBlock;
use crate::model::record::PackageRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lowercased field names every package record must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["package", "version", "description"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    MissingField {
        field: &'static str,
        record_index: usize,
        first_line: usize,
    },
}

impl Display for NormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField {
                field,
                record_index,
                first_line,
            } => write!(
                f,
                "record {record_index} starting at line {first_line} has no `{field}` field"
            ),
        }
    }
}

impl Error for NormalizeError {}

/// Converts a raw block into a [`PackageRecord`], tagging it with `source`.
pub fn normalize_block(
    block: &PackageBlock,
    source: Option<&str>,
) -> Result<PackageRecord, NormalizeError> {
    let [package, version, description] = REQUIRED_FIELDS;

    let record = PackageRecord::new(
        required(block, package)?,
        required(block, version)?,
        required(block, description)?,
    );
    Ok(match source {
        Some(source) => record.with_source(source),
        None => record,
    })
}

fn required<'a>(block: &'a PackageBlock, field: &'static str) -> Result<&'a str, NormalizeError> {
    block.get(field).ok_or(NormalizeError::MissingField {
        field,
        record_index: block.index,
        first_line: block.first_line,
    })
}
