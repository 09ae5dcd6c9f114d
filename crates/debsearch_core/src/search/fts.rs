//! SQLite FTS5-based search over loaded package metadata.
//!
//! # Responsibility
//! - Provide keyword search over package names and file paths.
//! - Return typed records decoded from the FTS tables.
//!
//! # Invariants
//! - Queries are restricted to the `name` (packages) or `filename`
//!   (contents) column.
//! - A table that was never loaded searches as empty, not as an error.
//! - Result ordering is deterministic by rank, then by the searched column.

use crate::db::DbError;
use crate::load::{table_exists, TableSchema};
use crate::model::record::{ContentRecord, PackageRecord};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum hits returned when the caller does not choose a limit.
pub const DEFAULT_SEARCH_LIMIT: u32 = 80;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing and DB interaction.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    ///
    /// Default is `false`, so punctuation in package names cannot produce
    /// syntax errors.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            raw_fts_syntax: false,
        }
    }
}

/// Searches package names. Every whitespace-separated term must match.
pub fn search_packages(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<PackageRecord>> {
    run_search(conn, &TableSchema::packages(), "name", query, |row| {
        Ok(PackageRecord {
            name: row.get("name")?,
            version: row.get("version")?,
            description: row.get("description")?,
            source: row.get("source")?,
        })
    })
}

/// Searches file paths in the contents map.
pub fn search_files(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<ContentRecord>> {
    run_search(conn, &TableSchema::contents(), "filename", query, |row| {
        Ok(ContentRecord {
            filename: row.get("filename")?,
            package: row.get("package")?,
        })
    })
}

fn run_search<T>(
    conn: &Connection,
    schema: &TableSchema,
    column: &str,
    query: &SearchQuery,
    decode: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
) -> SearchResult<Vec<T>> {
    let Some(match_expr) = build_match_expression(column, query) else {
        return Ok(Vec::new());
    };

    if query.limit == 0 || !table_exists(conn, schema.name())? {
        return Ok(Vec::new());
    }

    let table = schema.name();
    let sql = format!(
        "SELECT {columns}
         FROM {table}
         WHERE {table} MATCH ?1
         ORDER BY rank, {column} ASC
         LIMIT ?2",
        columns = schema.columns().join(", "),
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut rows = stmt
        .query(params![match_expr, i64::from(query.limit)])
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(decode(row)?);
    }

    Ok(hits)
}

fn build_match_expression(column: &str, query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(format!("{column} : ({text})"));
    }

    let terms = text
        .split_whitespace()
        .map(|term| format!("{column} : {}", escape_fts_term(term)))
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

/// Classifies errors from every stage of a search statement, prepare included.
fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
                || msg.contains("no such column")
        }
        _ => false,
    }
}
