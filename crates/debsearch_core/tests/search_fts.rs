mod common;

use common::StubSource;
use debsearch_core::db::open_db_in_memory;
use debsearch_core::{
    load_contents, load_packages, search_files, search_packages, ParsePolicy, SearchError,
    SearchQuery, SourceCatalog, SourceCatalogEntry,
};
use rusqlite::Connection;

const PACKAGES_URL: &str = "http://archive.test/main/Packages.gz";
const CONTENTS_URL: &str = "http://archive.test/Contents-amd64.gz";

fn seeded_connection() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    let source = StubSource::default()
        .with(
            PACKAGES_URL,
            "Package: curl\nVersion: 7.58.0-2\nDescription: command line tool\n\n\
             Package: libcurl4\nVersion: 7.58.0-2\nDescription: easy-to-use client-side URL transfer library\n\n\
             Package: wget\nVersion: 1.19.4\nDescription: retrieves files from the web\n",
        )
        .with(
            CONTENTS_URL,
            "usr/bin/curl web/curl\nusr/bin/wget web/wget\nusr/share/doc/curl/copyright web/curl\n",
        );
    let catalog = SourceCatalog::new(vec![SourceCatalogEntry::new("main", PACKAGES_URL)]);

    load_packages(&mut conn, &catalog, &source, ParsePolicy::Lenient).unwrap();
    load_contents(&mut conn, CONTENTS_URL, &source, ParsePolicy::Lenient).unwrap();
    conn
}

#[test]
fn search_packages_matches_on_name() {
    let conn = seeded_connection();

    let hits = search_packages(&conn, &SearchQuery::new("curl")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "curl");
    assert_eq!(hits[0].version, "7.58.0-2");
    assert_eq!(hits[0].source.as_deref(), Some("main"));
}

#[test]
fn search_packages_ignores_description_text() {
    let conn = seeded_connection();
    let hits = search_packages(&conn, &SearchQuery::new("web")).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn search_files_matches_path_terms() {
    let conn = seeded_connection();

    let hits = search_files(&conn, &SearchQuery::new("curl")).unwrap();
    let packages: Vec<_> = hits.iter().map(|hit| hit.package.as_str()).collect();
    assert_eq!(packages, ["web/curl", "web/curl"]);

    let hits = search_files(&conn, &SearchQuery::new("usr bin wget")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "usr/bin/wget");
}

#[test]
fn limit_is_applied_and_zero_returns_nothing() {
    let conn = seeded_connection();

    let mut query = SearchQuery::new("usr");
    query.limit = 2;
    assert_eq!(search_files(&conn, &query).unwrap().len(), 2);

    query.limit = 0;
    assert!(search_files(&conn, &query).unwrap().is_empty());
}

#[test]
fn blank_query_returns_empty_results() {
    let conn = seeded_connection();
    assert!(search_packages(&conn, &SearchQuery::new("   "))
        .unwrap()
        .is_empty());
}

#[test]
fn unloaded_table_searches_as_empty() {
    let conn = open_db_in_memory().unwrap();
    assert!(search_packages(&conn, &SearchQuery::new("curl"))
        .unwrap()
        .is_empty());
    assert!(search_files(&conn, &SearchQuery::new("curl"))
        .unwrap()
        .is_empty());
}

#[test]
fn escaped_query_text_does_not_fail_on_common_symbols() {
    let conn = seeded_connection();
    let hits = search_packages(&conn, &SearchQuery::new("lib:curl")).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn raw_fts_syntax_reports_invalid_query() {
    let conn = seeded_connection();

    let mut query = SearchQuery::new("\"unterminated");
    query.raw_fts_syntax = true;

    let err = search_packages(&conn, &query).unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery { .. }));
}

#[test]
fn statement_errors_at_prepare_are_classified() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE VIRTUAL TABLE packages USING fts4(name, version, source, description);
         INSERT INTO packages VALUES ('curl', '1', 'main', 'tool');",
    )
    .unwrap();

    // fts4 has no `rank` column, so the statement fails before any row is read.
    match search_packages(&conn, &SearchQuery::new("curl")).unwrap_err() {
        SearchError::InvalidQuery { query, message } => {
            assert_eq!(query, "name : \"curl\"");
            assert!(message.contains("rank"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
