use debsearch_core::db::{open_db, open_db_in_memory};
use debsearch_core::{BulkLoader, PackageRecord, TableSchema};

#[test]
fn open_db_in_memory_supports_fts5() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE VIRTUAL TABLE scratch USING fts5(body);")
        .unwrap();
}

#[test]
fn loaded_table_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.sqlite3");

    let mut first = open_db(&path).unwrap();
    let written = BulkLoader::new(&mut first)
        .replace_all(
            &TableSchema::packages(),
            vec![PackageRecord::new("jq", "1.5", "json processor").with_source("universe")],
        )
        .unwrap();
    assert_eq!(written, 1);
    drop(first);

    let mut second = open_db(&path).unwrap();
    BulkLoader::new(&mut second)
        .ensure_table(&TableSchema::packages())
        .unwrap();
    let (name, source): (String, String) = second
        .query_row("SELECT name, source FROM packages;", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(name, "jq");
    assert_eq!(source, "universe");
}
