//! Bulk loading into SQLite FTS5 tables.
//!
//! # Responsibility
//! - Own table schemas and their idempotent creation.
//! - Replace table contents transactionally from a row stream.
//!
//! # Invariants
//! - This module issues the only writes to the search database.
//! - Table and column names are validated before being spliced into SQL.

use crate::db::DbError;
use crate::model::record::{ContentRecord, PackageRecord};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod bulk;

pub use bulk::{BulkLoader, LoadSession};

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug)]
pub enum LoadError {
    InvalidIdentifier(String),
    /// An existing table does not have the columns this loader writes.
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// An existing table with this name is not an FTS5 virtual table.
    EngineMismatch { table: String, sql: String },
    /// A row produced a different number of values than the schema has columns.
    ColumnCount {
        table: String,
        row_index: usize,
        expected: usize,
        found: usize,
    },
    Insert {
        table: String,
        row_index: usize,
        source: rusqlite::Error,
    },
    Db(DbError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier `{name}`"),
            Self::SchemaMismatch {
                table,
                expected,
                found,
            } => write!(
                f,
                "table `{table}` has columns [{}], expected [{}]",
                found.join(", "),
                expected.join(", ")
            ),
            Self::EngineMismatch { table, sql } => {
                write!(f, "table `{table}` is not an fts5 table: {sql}")
            }
            Self::ColumnCount {
                table,
                row_index,
                expected,
                found,
            } => write!(
                f,
                "row {row_index} for `{table}` has {found} values, expected {expected}"
            ),
            Self::Insert {
                table,
                row_index,
                source,
            } => write!(f, "insert of row {row_index} into `{table}` failed: {source}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Insert { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::InvalidIdentifier(_)
            | Self::SchemaMismatch { .. }
            | Self::EngineMismatch { .. }
            | Self::ColumnCount { .. } => None,
        }
    }
}

impl From<DbError> for LoadError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LoadError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Name and ordered text columns of one full-text table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<String>,
}

impl TableSchema {
    /// Builds a schema after validating every identifier.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for ident in std::iter::once(&name).chain(columns.iter()) {
            if !is_valid_identifier(ident) {
                return Err(LoadError::InvalidIdentifier(ident.clone()));
            }
        }
        if columns.is_empty() {
            return Err(LoadError::InvalidIdentifier(format!("{name}()")));
        }
        Ok(Self { name, columns })
    }

    /// `packages(name, version, source, description)`.
    pub fn packages() -> Self {
        Self::fixed("packages", &["name", "version", "source", "description"])
    }

    /// `contents(filename, package)`.
    pub fn contents() -> Self {
        Self::fixed("contents", &["filename", "package"])
    }

    fn fixed(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn create_sql(&self) -> String {
        format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5({});",
            self.name,
            self.columns.join(", ")
        )
    }

    pub(crate) fn insert_sql(&self) -> String {
        let placeholders = (1..=self.columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            self.name,
            self.columns.join(", ")
        )
    }

    pub(crate) fn delete_sql(&self) -> String {
        format!("DELETE FROM {};", self.name)
    }
}

/// A value that can be written as one row of a full-text table.
pub trait FtsRow {
    /// Values in schema column order.
    fn column_values(&self) -> Vec<Value>;
}

impl FtsRow for PackageRecord {
    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Text(self.version.clone()),
            self.source.clone().map_or(Value::Null, Value::Text),
            Value::Text(self.description.clone()),
        ]
    }
}

impl FtsRow for ContentRecord {
    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.filename.clone()),
            Value::Text(self.package.clone()),
        ]
    }
}

fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool, DbError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// `CREATE` statement SQLite recorded for `table`, if the table exists.
pub(crate) fn table_sql(conn: &Connection, table: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT sql
         FROM sqlite_master
         WHERE type = 'table' AND name = ?1;",
    )?;
    let mut rows = stmt.query([table])?;
    match rows.next()? {
        Some(row) => Ok(row.get::<_, Option<String>>(0)?),
        None => Ok(None),
    }
}

pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{FtsRow, LoadError, TableSchema};
    use crate::model::record::PackageRecord;
    use rusqlite::types::Value;

    #[test]
    fn schema_rejects_unsafe_identifiers() {
        let err = TableSchema::new("packages; DROP TABLE x", ["name"]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIdentifier(_)));

        let err = TableSchema::new("files", ["file name"]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIdentifier(name) if name == "file name"));

        assert!(TableSchema::new("files", Vec::<String>::new()).is_err());
    }

    #[test]
    fn insert_sql_binds_every_column() {
        assert_eq!(
            TableSchema::packages().insert_sql(),
            "INSERT INTO packages (name, version, source, description) VALUES (?1, ?2, ?3, ?4);"
        );
        assert_eq!(
            TableSchema::contents().create_sql(),
            "CREATE VIRTUAL TABLE IF NOT EXISTS contents USING fts5(filename, package);"
        );
    }

    #[test]
    fn untagged_package_writes_null_source() {
        let values = PackageRecord::new("a", "1", "d").column_values();
        assert_eq!(values[2], Value::Null);
        assert_eq!(values.len(), TableSchema::packages().columns().len());
    }
}
