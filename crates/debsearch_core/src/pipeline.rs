//! Ingest pipelines: fetch, tokenize, normalize and bulk-load.
//!
//! # Responsibility
//! - Drive the package pipeline across every catalog section into one table.
//! - Drive the contents pipeline into the `contents` table.
//! - Apply the run's [`ParsePolicy`] uniformly to every anomaly.
//!
//! # Invariants
//! - A table is never cleared before the first upstream fetch succeeded.
//! - Clear, inserts and commit share one transaction; any failure leaves the
//!   previous table contents untouched.
//! - Every failure leaves this module as an [`IngestError`] with context.

use crate::fetch::{FetchError, IndexSource};
use crate::load::{BulkLoader, LoadError, TableSchema};
use crate::logging::sanitize_message;
use crate::model::catalog::SourceCatalog;
use crate::model::record::{ContentRecord, PackageRecord};
use crate::parse::{
    normalize_block, ContentEntries, MalformedLine, NormalizeError, PackageBlock, PackageBlocks,
    ParseError, ParsePolicy,
};
use log::{error, info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const MAX_LOGGED_LINE_CHARS: usize = 120;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug)]
pub enum IngestError {
    /// The catalog has no sections, so there is nothing to replace the table with.
    EmptyCatalog,
    Fetch {
        section: Option<String>,
        source: FetchError,
    },
    Parse {
        section: Option<String>,
        source: ParseError,
    },
    Normalize {
        section: Option<String>,
        source: NormalizeError,
    },
    Load(LoadError),
}

impl IngestError {
    fn section(&self) -> Option<&str> {
        match self {
            Self::Fetch { section, .. }
            | Self::Parse { section, .. }
            | Self::Normalize { section, .. } => section.as_deref(),
            Self::EmptyCatalog | Self::Load(_) => None,
        }
    }
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(section) = self.section() {
            write!(f, "[{section}] ")?;
        }
        match self {
            Self::EmptyCatalog => write!(f, "source catalog is empty"),
            Self::Fetch { source, .. } => write!(f, "{source}"),
            Self::Parse { source, .. } => write!(f, "{source}"),
            Self::Normalize { source, .. } => write!(f, "{source}"),
            Self::Load(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EmptyCatalog => None,
            Self::Fetch { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Normalize { source, .. } => Some(source),
            Self::Load(err) => Some(err),
        }
    }
}

impl From<LoadError> for IngestError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

/// Rows written for one catalog section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub label: String,
    pub url: String,
    pub rows: usize,
}

/// Outcome of one successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub rows_written: usize,
    pub sections: Vec<SectionReport>,
    /// Lines skipped under the lenient policy.
    pub malformed_lines: usize,
    /// Package blocks dropped for missing required fields.
    pub dropped_records: usize,
}

impl LoadReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            rows_written: 0,
            sections: Vec::new(),
            malformed_lines: 0,
            dropped_records: 0,
        }
    }
}

#[derive(Debug, Default)]
struct AnomalyCounts {
    malformed_lines: usize,
    dropped_records: usize,
}

/// Loads every catalog section into the `packages` table, replacing it.
///
/// Sections are processed in catalog order; each row is tagged with its
/// section label. The table is cleared once, after the first section was
/// fetched successfully.
pub fn load_packages(
    conn: &mut Connection,
    catalog: &SourceCatalog,
    source: &dyn IndexSource,
    policy: ParsePolicy,
) -> IngestResult<LoadReport> {
    logged_run("packages", policy, || {
        if catalog.is_empty() {
            return Err(IngestError::EmptyCatalog);
        }

        let schema = TableSchema::packages();
        let mut loader = BulkLoader::new(conn);
        let mut session = loader.begin(&schema)?;
        let mut report = LoadReport::new(schema.name());

        for (position, entry) in catalog.entries().iter().enumerate() {
            let reader = source.open(&entry.url).map_err(|err| IngestError::Fetch {
                section: Some(entry.label.clone()),
                source: err,
            })?;
            if position == 0 {
                session.clear()?;
            }

            let mut counts = AnomalyCounts::default();
            let rows = PackageBlocks::new(reader)
                .filter_map(|block| admit_block(block, &entry.label, policy, &mut counts));
            let rows_in_section = session.insert_all(rows)?;

            info!(
                "event=section_load module=pipeline status=ok section={} rows={} malformed_lines={} dropped_records={}",
                entry.label, rows_in_section, counts.malformed_lines, counts.dropped_records
            );
            report.malformed_lines += counts.malformed_lines;
            report.dropped_records += counts.dropped_records;
            report.sections.push(SectionReport {
                label: entry.label.clone(),
                url: entry.url.clone(),
                rows: rows_in_section,
            });
        }

        report.rows_written = session.commit()?;
        Ok(report)
    })
}

/// Loads the file-to-package map at `url` into the `contents` table.
pub fn load_contents(
    conn: &mut Connection,
    url: &str,
    source: &dyn IndexSource,
    policy: ParsePolicy,
) -> IngestResult<LoadReport> {
    logged_run("contents", policy, || {
        let reader = source.open(url).map_err(|err| IngestError::Fetch {
            section: None,
            source: err,
        })?;

        let schema = TableSchema::contents();
        let mut counts = AnomalyCounts::default();
        let rows = ContentEntries::new(reader)
            .filter_map(|entry| admit_content(entry, policy, &mut counts));
        let rows_written = BulkLoader::new(conn).load(&schema, rows)?;

        let mut report = LoadReport::new(schema.name());
        report.rows_written = rows_written;
        report.malformed_lines = counts.malformed_lines;
        report.sections.push(SectionReport {
            label: url_basename(url).to_string(),
            url: url.to_string(),
            rows: rows_written,
        });
        Ok(report)
    })
}

/// Last path segment of `url`, e.g. `Contents-amd64.gz`.
fn url_basename(url: &str) -> &str {
    let path = url.trim_end_matches('/');
    match path.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name,
        _ => path,
    }
}

fn admit_block(
    block: Result<PackageBlock, ParseError>,
    section: &str,
    policy: ParsePolicy,
    counts: &mut AnomalyCounts,
) -> Option<IngestResult<PackageRecord>> {
    let block = match block {
        Ok(block) => block,
        Err(err) => {
            return Some(Err(IngestError::Parse {
                section: Some(section.to_string()),
                source: err,
            }))
        }
    };

    for line in &block.malformed {
        if policy.is_strict() {
            return Some(Err(IngestError::Parse {
                section: Some(section.to_string()),
                source: ParseError::MalformedLine(line.clone()),
            }));
        }
        log_skipped_line(Some(section), line);
        counts.malformed_lines += 1;
    }

    if !block.has_fields() {
        return None;
    }

    match normalize_block(&block, Some(section)) {
        Ok(record) => Some(Ok(record)),
        Err(err) if policy.is_strict() => Some(Err(IngestError::Normalize {
            section: Some(section.to_string()),
            source: err,
        })),
        Err(err) => {
            warn!(
                "event=record_dropped module=pipeline status=skipped section={section} reason={err}"
            );
            counts.dropped_records += 1;
            None
        }
    }
}

fn admit_content(
    entry: Result<ContentRecord, ParseError>,
    policy: ParsePolicy,
    counts: &mut AnomalyCounts,
) -> Option<IngestResult<ContentRecord>> {
    match entry {
        Ok(record) => Some(Ok(record)),
        Err(ParseError::MalformedLine(line)) if !policy.is_strict() => {
            log_skipped_line(None, &line);
            counts.malformed_lines += 1;
            None
        }
        Err(err) => Some(Err(IngestError::Parse {
            section: None,
            source: err,
        })),
    }
}

fn log_skipped_line(section: Option<&str>, line: &MalformedLine) {
    warn!(
        "event=malformed_line module=pipeline status=skipped section={} line_number={} text={}",
        section.unwrap_or("-"),
        line.line_number,
        sanitize_message(&line.text, MAX_LOGGED_LINE_CHARS)
    );
}

fn logged_run(
    table: &str,
    policy: ParsePolicy,
    run: impl FnOnce() -> IngestResult<LoadReport>,
) -> IngestResult<LoadReport> {
    let started_at = Instant::now();
    info!(
        "event=ingest module=pipeline status=start table={table} policy={}",
        policy.as_str()
    );

    match run() {
        Ok(report) => {
            info!(
                "event=ingest module=pipeline status=ok table={table} rows={} sections={} malformed_lines={} dropped_records={} duration_ms={}",
                report.rows_written,
                report.sections.len(),
                report.malformed_lines,
                report.dropped_records,
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=ingest module=pipeline status=error table={table} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
