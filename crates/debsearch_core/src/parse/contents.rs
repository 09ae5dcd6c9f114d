//! Tokenizer for `Contents-<arch>` file maps.
//!
//! # Invariants
//! - The owner list is the text after the LAST whitespace run; filenames may
//!   contain spaces, owner lists never do.
//! - One record is emitted per comma-separated owner, in input order.
//! - A line with no whitespace separator is reported as a non-fatal
//!   `ParseError::MalformedLine` and the iterator moves on.

use super::{LineReader, MalformedLine, ParseError, ParseResult};
use crate::model::record::ContentRecord;
use std::collections::VecDeque;
use std::io::BufRead;

/// Lazy iterator over `(filename, owner)` pairs of a contents stream.
pub struct ContentEntries<R> {
    lines: LineReader<R>,
    pending: VecDeque<ContentRecord>,
    finished: bool,
}

impl<R: BufRead> ContentEntries<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineReader::new(reader),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub fn line_number(&self) -> usize {
        self.lines.line_number()
    }
}

impl<R: BufRead> Iterator for ContentEntries<R> {
    type Item = ParseResult<ContentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.finished {
                return None;
            }

            let line = match self.lines.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match split_contents_line(trimmed) {
                Some((filename, owners)) => self.pending.extend(
                    owners
                        .split(',')
                        .map(|owner| ContentRecord::new(filename, owner)),
                ),
                None => {
                    return Some(Err(ParseError::MalformedLine(MalformedLine {
                        line_number: self.lines.line_number(),
                        text: trimmed.to_string(),
                    })))
                }
            }
        }
    }
}

/// Splits a trimmed contents line on its last whitespace run.
pub fn split_contents_line(line: &str) -> Option<(&str, &str)> {
    let split_at = line.rfind(char::is_whitespace)?;
    let owners = line[split_at..].trim_start();
    let filename = line[..split_at].trim_end();
    if filename.is_empty() || owners.is_empty() {
        return None;
    }
    Some((filename, owners))
}

#[cfg(test)]
mod tests {
    use super::{split_contents_line, ContentEntries};
    use crate::model::record::ContentRecord;
    use crate::parse::ParseError;
    use std::io::Cursor;

    fn entries(input: &str) -> Vec<Result<ContentRecord, ParseError>> {
        ContentEntries::new(Cursor::new(input.as_bytes().to_vec())).collect()
    }

    #[test]
    fn owner_list_expands_in_order() {
        let parsed: Vec<_> = entries("/usr/bin/foo  pkg1,pkg2,pkg3\n")
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            parsed,
            vec![
                ContentRecord::new("/usr/bin/foo", "pkg1"),
                ContentRecord::new("/usr/bin/foo", "pkg2"),
                ContentRecord::new("/usr/bin/foo", "pkg3"),
            ]
        );
    }

    #[test]
    fn filename_with_spaces_is_split_from_the_right() {
        assert_eq!(
            split_contents_line("usr/share/my app/file  owner1"),
            Some(("usr/share/my app/file", "owner1"))
        );
        assert_eq!(
            split_contents_line("usr/share/doc/a b\tc\tadmin/tool"),
            Some(("usr/share/doc/a b\tc", "admin/tool"))
        );
    }

    #[test]
    fn line_without_whitespace_is_reported_and_stream_continues() {
        let parsed = entries("lonelytoken\nusr/bin/ok utils/ok\n");
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            Err(ParseError::MalformedLine(line)) => {
                assert_eq!(line.line_number, 1);
                assert_eq!(line.text, "lonelytoken");
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert_eq!(
            parsed[1].as_ref().unwrap(),
            &ContentRecord::new("usr/bin/ok", "utils/ok")
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let parsed = entries("\n\nusr/bin/a x/a\n\n");
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn owner_tokens_are_not_trimmed_beyond_comma_split() {
        let parsed = entries("etc/conf admin/a,,net/b\n");
        let owners: Vec<_> = parsed
            .into_iter()
            .map(|item| item.unwrap().package)
            .collect();
        assert_eq!(owners, ["admin/a", "", "net/b"]);
    }
}
