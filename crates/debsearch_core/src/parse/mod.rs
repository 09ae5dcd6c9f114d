//! Streaming tokenizers for Debian repository metadata.
//!
//! # Responsibility
//! - Turn decompressed index streams into lazy record sequences.
//! - Normalize raw package blocks into typed records.
//!
//! # Invariants
//! - Input is consumed line by line; no parsed structure spans the stream.
//! - Malformed lines never abort a tokenizer; policy is applied by callers.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::BufRead;

pub mod contents;
pub mod normalize;
pub mod packages;

pub use contents::ContentEntries;
pub use normalize::{normalize_block, NormalizeError, REQUIRED_FIELDS};
pub use packages::{PackageBlock, PackageBlocks};

pub type ParseResult<T> = Result<T, ParseError>;

/// Tokenizer-level failure.
#[derive(Debug)]
pub enum ParseError {
    /// Reading the underlying stream failed. Fatal for the stream.
    Io {
        line_number: usize,
        source: std::io::Error,
    },
    /// A line that cannot be tokenized. The stream continues after it.
    MalformedLine(MalformedLine),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io {
                line_number,
                source,
            } => write!(f, "read failed after line {line_number}: {source}"),
            Self::MalformedLine(line) => write!(f, "{line}"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::MalformedLine(_) => None,
        }
    }
}

/// A line the tokenizer could not split, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based line number in the decompressed stream.
    pub line_number: usize,
    pub text: String,
}

impl Display for MalformedLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed line {}: `{}`", self.line_number, self.text)
    }
}

/// How a run treats malformed lines and incomplete records.
///
/// The policy is chosen once per load and applied to every anomaly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Log and skip malformed lines; drop records missing required fields.
    #[default]
    Lenient,
    /// Abort the load on the first malformed line or incomplete record.
    Strict,
}

impl ParsePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }

    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

/// Line reader that tolerates invalid UTF-8 and tracks line numbers.
pub(crate) struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    /// Returns the next line without its terminator, or `None` at end of stream.
    pub(crate) fn next_line(&mut self) -> ParseResult<Option<String>> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| ParseError::Io {
                line_number: self.line_number,
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some(String::from_utf8_lossy(&self.buf[..end]).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::LineReader;
    use std::io::Cursor;

    #[test]
    fn line_reader_strips_terminators_and_counts_lines() {
        let mut reader = LineReader::new(Cursor::new(b"one\r\ntwo\nthree".to_vec()));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("one"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("two"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("three"));
        assert_eq!(reader.line_number(), 3);
        assert!(reader.next_line().unwrap().is_none());
    }

    #[test]
    fn line_reader_replaces_invalid_utf8() {
        let mut reader = LineReader::new(Cursor::new(b"usr/bin/caf\xe9 pkg\n".to_vec()));
        let line = reader.next_line().unwrap().unwrap();
        assert!(line.starts_with("usr/bin/caf"));
        assert!(line.ends_with(" pkg"));
    }
}
