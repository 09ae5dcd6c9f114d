//! Upstream index retrieval.
//!
//! # Responsibility
//! - Retrieve index payloads over HTTP or from local files.
//! - Transparently decode gzip payloads into a line-readable stream.
//!
//! # Invariants
//! - A non-2xx response is an error; no partial body is handed to parsers.
//! - The compressed payload is buffered in memory; decoding is streamed.

use flate2::read::MultiGzDecoder;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status { url: String, code: u16 },
    /// DNS, connect, TLS or protocol failure.
    Transport { url: String, message: String },
    Io { url: String, source: std::io::Error },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { url, code } => write!(f, "GET {url} returned status {code}"),
            Self::Transport { url, message } => write!(f, "GET {url} failed: {message}"),
            Self::Io { url, source } => write!(f, "reading {url} failed: {source}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Status { .. } | Self::Transport { .. } => None,
        }
    }
}

/// Something that can hand out the decompressed text of an index URL.
pub trait IndexSource {
    fn open(&self, url: &str) -> FetchResult<Box<dyn BufRead>>;
}

/// HTTP(S) source backed by a shared `ureq` agent.
pub struct HttpSource {
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .user_agent(concat!("debsearch/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSource for HttpSource {
    fn open(&self, url: &str) -> FetchResult<Box<dyn BufRead>> {
        let started_at = Instant::now();
        info!("event=fetch module=fetch status=start url={url}");

        let response = self.agent.get(url).call().map_err(|err| {
            let err = match err {
                ureq::Error::Status(code, _) => FetchError::Status {
                    url: url.to_string(),
                    code,
                },
                ureq::Error::Transport(transport) => FetchError::Transport {
                    url: url.to_string(),
                    message: transport.to_string(),
                },
            };
            error!(
                "event=fetch module=fetch status=error url={url} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            err
        })?;

        let mut payload = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut payload)
            .map_err(|source| FetchError::Io {
                url: url.to_string(),
                source,
            })?;

        info!(
            "event=fetch module=fetch status=ok url={url} bytes={} duration_ms={}",
            payload.len(),
            started_at.elapsed().as_millis()
        );
        Ok(decode_payload(payload))
    }
}

/// Local file source; accepts plain paths and `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl IndexSource for FileSource {
    fn open(&self, url: &str) -> FetchResult<Box<dyn BufRead>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let payload = std::fs::read(Path::new(path)).map_err(|source| FetchError::Io {
            url: url.to_string(),
            source,
        })?;
        info!(
            "event=fetch module=fetch status=ok url={url} bytes={}",
            payload.len()
        );
        Ok(decode_payload(payload))
    }
}

/// Dispatches `http://`/`https://` URLs to [`HttpSource`], everything else to
/// [`FileSource`].
#[derive(Default)]
pub struct AutoSource {
    http: HttpSource,
    file: FileSource,
}

impl IndexSource for AutoSource {
    fn open(&self, url: &str) -> FetchResult<Box<dyn BufRead>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.open(url)
        } else {
            self.file.open(url)
        }
    }
}

/// Wraps a payload in a reader, decoding gzip when the magic bytes match.
///
/// Every member of a multi-member gzip stream is decoded in order.
pub fn decode_payload(payload: Vec<u8>) -> Box<dyn BufRead> {
    if payload.starts_with(&GZIP_MAGIC) {
        Box::new(BufReader::new(MultiGzDecoder::new(Cursor::new(payload))))
    } else {
        Box::new(Cursor::new(payload))
    }
}
