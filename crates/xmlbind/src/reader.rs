//! Positioned, line-buffered reader over a character source.
//!
//! The reader pulls one line at a time from a [`LineSource`] and hands the
//! scanner a flat stream of characters. Crossing a line boundary is invisible
//! to callers except that it always shows up as a single `'\n'`. The reader
//! tracks `(line, column)` so the scanner can position its errors.
//!
//! Sources are line-oriented so the crate never needs `std::io`: a borrowed
//! `&str` splits into lines, and the `std` feature adds an adapter for any
//! `io::BufRead`.

use alloc::string::{String, ToString};

use crate::error::SourceError;

/// A source of lines of XML text.
///
/// `next_line` yields lines without their terminators; `Ok(None)` means the
/// source is exhausted. A read failure is fatal and aborts the parse.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<String>, SourceError>;
}

/// A [`LineSource`] over a borrowed string.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    lines: core::str::Lines<'a>,
}

impl<'a> StrSource<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
        }
    }
}

impl<'a> From<&'a str> for StrSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text)
    }
}

impl LineSource for StrSource<'_> {
    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.lines.next().map(ToString::to_string))
    }
}

/// A [`LineSource`] over any buffered reader.
#[cfg(feature = "std")]
pub struct IoSource<R> {
    inner: R,
}

#[cfg(feature = "std")]
impl<R: std::io::BufRead> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[cfg(feature = "std")]
impl<R: std::io::BufRead> LineSource for IoSource<R> {
    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut line = String::new();
        match self.inner.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Ok(Some(line))
            }
            Err(err) => Err(SourceError(err.to_string())),
        }
    }
}

/// Line-buffered cursor with single-character lookahead.
#[derive(Debug)]
pub struct Reader<S> {
    source: S,
    line: String,
    offset: usize,
    started: bool,
    done: bool,
    line_no: usize,
    column: usize,
}

impl<S: LineSource> Reader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            line: String::new(),
            offset: 0,
            started: false,
            done: false,
            line_no: 1,
            column: 1,
        }
    }

    /// Current `(line, column)`, both 1-based.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.line_no, self.column)
    }

    fn pull_line(&mut self) -> Result<(), SourceError> {
        match self.source.next_line()? {
            Some(line) => {
                self.line = line;
                self.offset = 0;
            }
            None => {
                self.done = true;
                self.line.clear();
                self.offset = 0;
            }
        }
        Ok(())
    }

    fn ensure_started(&mut self) -> Result<(), SourceError> {
        if !self.started {
            self.started = true;
            self.pull_line()?;
        }
        Ok(())
    }

    /// Decodes the next character without consuming it. `None` at end of
    /// input. A line boundary reads as a single `'\n'`.
    pub fn peek_char(&mut self) -> Result<Option<char>, SourceError> {
        self.ensure_started()?;
        if self.done {
            return Ok(None);
        }
        if self.offset >= self.line.len() {
            return Ok(Some('\n'));
        }
        Ok(Some(decode_at(&self.line, self.offset).0))
    }

    /// Consumes and returns the next character.
    pub fn read_char(&mut self) -> Result<Option<char>, SourceError> {
        self.ensure_started()?;
        if self.done {
            return Ok(None);
        }
        if self.offset >= self.line.len() {
            self.pull_line()?;
            self.line_no += 1;
            self.column = 1;
            return Ok(Some('\n'));
        }
        let (ch, len) = decode_at(&self.line, self.offset);
        self.offset += len;
        self.column += 1;
        Ok(Some(ch))
    }

    /// Consumes up to `n` characters, stopping early at end of input.
    pub fn read_chars(&mut self, n: usize) -> Result<String, SourceError> {
        let mut out = String::new();
        for _ in 0..n {
            match self.read_char()? {
                Some(ch) => out.push(ch),
                None => break,
            }
        }
        Ok(out)
    }

    /// Reads everything up to (excluding) the first occurrence of
    /// `delimiter`, spanning line boundaries, and consumes the delimiter.
    /// Returns `None` if the source ends before the delimiter is seen.
    pub fn read_until(&mut self, delimiter: &str) -> Result<Option<String>, SourceError> {
        let mut out = String::new();
        while let Some(ch) = self.read_char()? {
            out.push(ch);
            if out.ends_with(delimiter) {
                out.truncate(out.len() - delimiter.len());
                return Ok(Some(out));
            }
        }
        Ok(None)
    }

    /// Consumes leading whitespace, including line boundaries.
    pub fn trim_leading_whitespace(&mut self) -> Result<(), SourceError> {
        while let Some(ch) = self.peek_char()? {
            if !ch.is_whitespace() {
                break;
            }
            self.read_char()?;
        }
        Ok(())
    }

    pub fn has_more(&mut self) -> Result<bool, SourceError> {
        Ok(self.peek_char()?.is_some())
    }

    /// Non-consuming lookahead of up to `n` characters within the current
    /// line. Shorter near a line boundary; dispatch only ever looks at this
    /// right after trimming whitespace, so the interesting prefix is always
    /// inside one line.
    #[must_use]
    pub fn peek_prefix(&self, n: usize) -> &str {
        let rest = &self.line[self.offset.min(self.line.len())..];
        match rest.char_indices().nth(n) {
            Some((idx, _)) => &rest[..idx],
            None => rest,
        }
    }
}

fn decode_at(line: &str, offset: usize) -> (char, usize) {
    let (ch, len) = bstr::decode_utf8(&line.as_bytes()[offset..]);
    (ch.unwrap_or('\u{FFFD}'), len.max(1))
}
