#![allow(dead_code)]

use debsearch_core::fetch::{decode_payload, FetchError, FetchResult, IndexSource};
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::Connection;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// In-memory stand-in for the HTTP archive; unknown URLs answer 404.
#[derive(Default)]
pub struct StubSource {
    payloads: HashMap<String, Vec<u8>>,
}

impl StubSource {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.payloads.insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn with_gzip(mut self, url: &str, body: &str) -> Self {
        self.payloads.insert(url.to_string(), gzip(body));
        self
    }
}

impl IndexSource for StubSource {
    fn open(&self, url: &str) -> FetchResult<Box<dyn BufRead>> {
        match self.payloads.get(url) {
            Some(payload) => Ok(decode_payload(payload.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                code: 404,
            }),
        }
    }
}

pub fn gzip(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
