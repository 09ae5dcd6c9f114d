//! Transactional full-replace loader.
//!
//! # Responsibility
//! - Create FTS5 tables on first use and reuse them afterwards.
//! - Clear, insert and commit inside a single transaction.
//!
//! # Invariants
//! - `ensure_table` is a no-op when the table already exists with the
//!   expected columns.
//! - Nothing written by a session is visible until `commit`; dropping an
//!   uncommitted session rolls back and leaves the previous rows in place.
//! - The loader borrows the connection mutably, so one writer at a time.

use super::{table_columns, table_sql, FtsRow, LoadError, LoadResult, TableSchema};
use log::{debug, info};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::time::Instant;

const PROGRESS_EVERY_ROWS: usize = 100_000;

/// Single-writer bulk loader over one SQLite connection.
pub struct BulkLoader<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> BulkLoader<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Creates the table if it is absent.
    ///
    /// # Errors
    /// - `LoadError::EngineMismatch` when a table with that name exists but
    ///   is not an FTS5 virtual table.
    /// - `LoadError::SchemaMismatch` when a table with that name exists with
    ///   different columns.
    pub fn ensure_table(&self, schema: &TableSchema) -> LoadResult<()> {
        ensure_table_on(&*self.conn, schema)
    }

    /// Starts a replace session: ensures the table and opens the transaction.
    ///
    /// Rows are not cleared until [`LoadSession::clear`] is called, so callers
    /// can confirm their input is available first.
    pub fn begin(&mut self, schema: &TableSchema) -> LoadResult<LoadSession<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_table_on(&tx, schema)?;
        info!(
            "event=bulk_load module=load status=start table={}",
            schema.name()
        );
        Ok(LoadSession {
            insert_sql: schema.insert_sql(),
            schema: schema.clone(),
            tx,
            rows_written: 0,
            started_at: Instant::now(),
        })
    }

    /// Replaces the table contents with `rows` and returns the row count.
    pub fn replace_all<R, I>(&mut self, schema: &TableSchema, rows: I) -> LoadResult<usize>
    where
        R: FtsRow,
        I: IntoIterator<Item = R>,
    {
        self.load(schema, rows.into_iter().map(Ok::<R, LoadError>))
    }

    /// Like [`Self::replace_all`] for row streams that can fail mid-way.
    ///
    /// The first `Err` from `rows` aborts the load and is returned unchanged;
    /// the table keeps its previous contents.
    pub fn load<R, E, I>(&mut self, schema: &TableSchema, rows: I) -> Result<usize, E>
    where
        R: FtsRow,
        E: From<LoadError>,
        I: IntoIterator<Item = Result<R, E>>,
    {
        let mut session = self.begin(schema)?;
        session.clear()?;
        session.insert_all(rows)?;
        Ok(session.commit()?)
    }
}

/// An open replace transaction on one table.
pub struct LoadSession<'conn> {
    tx: Transaction<'conn>,
    schema: TableSchema,
    insert_sql: String,
    rows_written: usize,
    started_at: Instant,
}

impl LoadSession<'_> {
    /// Deletes every existing row; returns how many were removed.
    pub fn clear(&mut self) -> LoadResult<usize> {
        let removed = self.tx.execute(&self.schema.delete_sql(), [])?;
        info!(
            "event=table_clear module=load status=ok table={} removed={}",
            self.schema.name(),
            removed
        );
        Ok(removed)
    }

    /// Inserts every row of `rows`; returns how many this call wrote.
    pub fn insert_all<R, E, I>(&mut self, rows: I) -> Result<usize, E>
    where
        R: FtsRow,
        E: From<LoadError>,
        I: IntoIterator<Item = Result<R, E>>,
    {
        let expected = self.schema.columns().len();
        let mut stmt = self
            .tx
            .prepare_cached(&self.insert_sql)
            .map_err(LoadError::from)?;
        let mut inserted = 0;

        for row in rows {
            let values = row?.column_values();
            let row_index = self.rows_written;
            if values.len() != expected {
                return Err(LoadError::ColumnCount {
                    table: self.schema.name().to_string(),
                    row_index,
                    expected,
                    found: values.len(),
                }
                .into());
            }

            stmt.execute(params_from_iter(values))
                .map_err(|source| LoadError::Insert {
                    table: self.schema.name().to_string(),
                    row_index,
                    source,
                })?;

            self.rows_written += 1;
            inserted += 1;
            if self.rows_written % PROGRESS_EVERY_ROWS == 0 {
                debug!(
                    "event=bulk_load module=load status=progress table={} rows={}",
                    self.schema.name(),
                    self.rows_written
                );
            }
        }

        Ok(inserted)
    }

    /// Total rows written in this session so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Commits the session and returns the total row count.
    pub fn commit(self) -> LoadResult<usize> {
        let Self {
            tx,
            schema,
            rows_written,
            started_at,
            ..
        } = self;
        tx.commit()?;
        info!(
            "event=bulk_load module=load status=ok table={} rows={} duration_ms={}",
            schema.name(),
            rows_written,
            started_at.elapsed().as_millis()
        );
        Ok(rows_written)
    }
}

fn ensure_table_on(conn: &Connection, schema: &TableSchema) -> LoadResult<()> {
    conn.execute_batch(&schema.create_sql())?;

    // `IF NOT EXISTS` keeps a same-named table built with another engine.
    let sql = table_sql(conn, schema.name())?.unwrap_or_default();
    if !is_fts5_table(&sql) {
        return Err(LoadError::EngineMismatch {
            table: schema.name().to_string(),
            sql,
        });
    }

    let found = table_columns(conn, schema.name())?;
    if found != schema.columns() {
        return Err(LoadError::SchemaMismatch {
            table: schema.name().to_string(),
            expected: schema.columns().to_vec(),
            found,
        });
    }
    Ok(())
}

fn is_fts5_table(create_sql: &str) -> bool {
    let sql = create_sql
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    if !sql.starts_with("create virtual table") {
        return false;
    }
    sql.split_once(" using ")
        .map(|(_, module)| {
            let module = module.trim_start();
            module == "fts5" || module.starts_with("fts5(") || module.starts_with("fts5 (")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{is_fts5_table, BulkLoader};
    use crate::db::open_db_in_memory;
    use crate::load::{LoadError, TableSchema};
    use crate::model::record::ContentRecord;

    fn count(conn: &rusqlite::Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let mut conn = open_db_in_memory().unwrap();
        let loader = BulkLoader::new(&mut conn);
        loader.ensure_table(&TableSchema::contents()).unwrap();
        loader.ensure_table(&TableSchema::contents()).unwrap();
        assert_eq!(count(&conn, "contents"), 0);
    }

    #[test]
    fn ensure_table_rejects_conflicting_columns() {
        let mut conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE VIRTUAL TABLE contents USING fts5(path, owner);")
            .unwrap();

        let err = BulkLoader::new(&mut conn)
            .ensure_table(&TableSchema::contents())
            .unwrap_err();
        assert!(matches!(err, LoadError::SchemaMismatch { .. }));
    }

    #[test]
    fn ensure_table_rejects_other_fts_engine_with_same_columns() {
        let mut conn = open_db_in_memory().unwrap();
        conn.execute_batch(
            "CREATE VIRTUAL TABLE packages USING fts4(name, version, source, description);",
        )
        .unwrap();

        let err = BulkLoader::new(&mut conn)
            .ensure_table(&TableSchema::packages())
            .unwrap_err();
        match err {
            LoadError::EngineMismatch { table, sql } => {
                assert_eq!(table, "packages");
                assert!(sql.contains("fts4"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn engine_check_reads_module_name() {
        assert!(is_fts5_table(
            "CREATE VIRTUAL TABLE contents USING fts5(filename, package)"
        ));
        assert!(is_fts5_table("CREATE VIRTUAL TABLE t\n  USING   FTS5 (a)"));
        assert!(!is_fts5_table("CREATE VIRTUAL TABLE t USING fts4(a)"));
        assert!(!is_fts5_table("CREATE VIRTUAL TABLE t USING fts5vocab(a, row)"));
        assert!(!is_fts5_table(""));
    }

    #[test]
    fn ensure_table_rejects_plain_table() {
        let mut conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE contents (filename TEXT, package TEXT);")
            .unwrap();

        let err = BulkLoader::new(&mut conn)
            .ensure_table(&TableSchema::contents())
            .unwrap_err();
        assert!(matches!(err, LoadError::EngineMismatch { .. }));
    }

    #[test]
    fn replace_all_removes_previous_rows() {
        let mut conn = open_db_in_memory().unwrap();
        let schema = TableSchema::contents();
        let mut loader = BulkLoader::new(&mut conn);

        let first = loader
            .replace_all(
                &schema,
                vec![
                    ContentRecord::new("bin/a", "x/a"),
                    ContentRecord::new("bin/b", "x/b"),
                ],
            )
            .unwrap();
        assert_eq!(first, 2);

        let second = loader
            .replace_all(&schema, vec![ContentRecord::new("bin/c", "x/c")])
            .unwrap();
        assert_eq!(second, 1);
        assert_eq!(count(&conn, "contents"), 1);
    }

    #[test]
    fn failing_row_stream_keeps_previous_rows() {
        let mut conn = open_db_in_memory().unwrap();
        let schema = TableSchema::contents();
        let mut loader = BulkLoader::new(&mut conn);
        loader
            .replace_all(&schema, vec![ContentRecord::new("bin/keep", "x/keep")])
            .unwrap();

        let rows = vec![
            Ok(ContentRecord::new("bin/new", "x/new")),
            Err(LoadError::InvalidIdentifier("boom".to_string())),
        ];
        let err = loader.load(&schema, rows).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIdentifier(_)));

        let filename: String = conn
            .query_row("SELECT filename FROM contents;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(filename, "bin/keep");
    }

    #[test]
    fn dropped_session_rolls_back_clear() {
        let mut conn = open_db_in_memory().unwrap();
        let schema = TableSchema::contents();
        {
            let mut loader = BulkLoader::new(&mut conn);
            loader
                .replace_all(&schema, vec![ContentRecord::new("bin/a", "x/a")])
                .unwrap();
            let mut session = loader.begin(&schema).unwrap();
            session.clear().unwrap();
            assert_eq!(session.rows_written(), 0);
        }
        assert_eq!(count(&conn, "contents"), 1);
    }
}
