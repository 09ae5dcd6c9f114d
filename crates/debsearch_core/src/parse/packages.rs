//! Tokenizer for `Packages` index files.
//!
//! # Responsibility
//! - Group `Field: value` lines into blocks separated by blank lines.
//!
//! # Invariants
//! - Field names are trimmed and lowercased; values are trimmed.
//! - Only the first colon separates name from value.
//! - A duplicate field inside one block overwrites the earlier value.
//! - Consecutive or leading blank lines never produce empty blocks.
//! - A final block without a trailing blank line is still emitted.

use super::{LineReader, MalformedLine, ParseResult};
use std::collections::BTreeMap;
use std::io::BufRead;

/// One raw block of fields from a package index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageBlock {
    /// 0-based position of this block in the stream.
    pub index: usize,
    /// Line number of the first line that contributed to this block.
    pub first_line: usize,
    pub fields: BTreeMap<String, String>,
    /// Lines inside this block that had no `:` separator.
    pub malformed: Vec<MalformedLine>,
}

impl PackageBlock {
    /// Looks up a field by its lowercased name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.malformed.is_empty()
    }
}

/// Lazy iterator over the blocks of a package index stream.
///
/// Restarting requires a fresh reader; the iterator is finished once the
/// underlying stream reports end of input or an I/O error.
pub struct PackageBlocks<R> {
    lines: LineReader<R>,
    current: PackageBlock,
    emitted: usize,
    finished: bool,
}

impl<R: BufRead> PackageBlocks<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineReader::new(reader),
            current: PackageBlock::default(),
            emitted: 0,
            finished: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    fn flush(&mut self) -> Option<PackageBlock> {
        if self.current.is_empty() {
            return None;
        }
        let mut block = std::mem::take(&mut self.current);
        block.index = self.emitted;
        self.emitted += 1;
        Some(block)
    }

    fn accept_line(&mut self, line: &str) {
        let line_number = self.lines.line_number();
        if self.current.is_empty() {
            self.current.first_line = line_number;
        }

        match line.split_once(':') {
            Some((name, value)) => {
                self.current
                    .fields
                    .insert(name.trim().to_lowercase(), value.trim().to_string());
            }
            None => self.current.malformed.push(MalformedLine {
                line_number,
                text: line.to_string(),
            }),
        }
    }
}

impl<R: BufRead> Iterator for PackageBlocks<R> {
    type Item = ParseResult<PackageBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    return self.flush().map(Ok);
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            let line = line.trim();
            if line.is_empty() {
                if let Some(block) = self.flush() {
                    return Some(Ok(block));
                }
                continue;
            }

            self.accept_line(line);
        }
    }
}
