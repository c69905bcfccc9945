//! Header sanitization and whitespace-delimited table reading.
//!
//! Tstat headers are decorated: a `#09#` or `#` prefix on the first column
//! and an ordinal suffix on every column (`#09#c_ip:1`, `s_bytes_uniq:21`).
//! [`canonical_field`] strips both, and [`LogReader`] yields one
//! [`SanitizedRow`] per data line, keyed by canonical field names.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use tt_common::Direction;

use super::numeric::{coerce, CellValue};

/// Decoration marker found in tstat header names.
pub const HEADER_MARKER: char = '#';

/// Separator between a column name and its ordinal suffix.
pub const ORDINAL_SEPARATOR: char = ':';

/// Canonicalize one raw header name.
///
/// Everything up to and including the right-most marker is discarded, then
/// the remainder is split on the ordinal separator and the left part kept.
/// Never fails; a malformed header yields an unexpected canonical name
/// whose values are later rejected by record validation.
pub fn canonical_field(raw: &str) -> &str {
    let rest = match raw.rfind(HEADER_MARKER) {
        Some(idx) => &raw[idx + HEADER_MARKER.len_utf8()..],
        None => raw,
    };
    rest.split(ORDINAL_SEPARATOR).next().unwrap_or_default()
}

/// Problems with a single data row.
///
/// A short row is rejected with a warning by the caller; an I/O fault
/// aborts the read.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("line {line}: expected {expected} cells, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One log row keyed by canonical field names.
///
/// On duplicate canonical names the last column wins.
#[derive(Debug, Clone, Default)]
pub struct SanitizedRow {
    cells: HashMap<String, String>,
}

impl SanitizedRow {
    /// Build a row from parallel header/cell slices.
    ///
    /// Cells beyond the header count are ignored; the caller rejects rows
    /// with fewer cells than headers before getting here.
    pub fn from_cells(headers: &[String], cells: &[&str]) -> Self {
        let mut map = HashMap::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(cells) {
            map.insert(header.clone(), (*cell).to_string());
        }
        Self { cells: map }
    }

    /// Build a row directly from key/value pairs (fixtures and tests).
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut map = HashMap::with_capacity(pairs.len());
        for (key, value) in pairs {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Self { cells: map }
    }

    /// Raw string cell for a canonical field name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells.get(key).map(String::as_str)
    }

    /// Coerced cell value for a canonical field name.
    pub fn value(&self, key: &str) -> Option<CellValue> {
        self.get(key).map(coerce)
    }

    /// Coerced cell value for a direction-prefixed field (`c_*` / `s_*`).
    pub fn directional(&self, direction: Direction, key: &str) -> Option<CellValue> {
        self.value(&Self::directional_key(direction, key))
    }

    /// The full column name a directional lookup resolves to.
    pub fn directional_key(direction: Direction, key: &str) -> String {
        format!("{}{}", direction.prefix(), key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Streaming reader over one whitespace-delimited tstat log.
///
/// The first line is consumed as the header row; every subsequent
/// non-empty line yields a [`SanitizedRow`] or a [`RowError`].
pub struct LogReader<R: BufRead> {
    headers: Vec<String>,
    lines: Lines<R>,
    line: usize,
}

impl LogReader<BufReader<File>> {
    /// Open a log file and consume its header line.
    pub fn open(path: &Path) -> io::Result<Self> {
        LogReader::new(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> LogReader<R> {
    /// Wrap a reader and consume its header line.
    pub fn new(reader: R) -> io::Result<Self> {
        let mut lines = reader.lines();
        let headers = match lines.next() {
            Some(line) => line?
                .split_whitespace()
                .map(|h| canonical_field(h).to_string())
                .collect(),
            None => Vec::new(),
        };
        Ok(Self {
            headers,
            lines,
            line: 1,
        })
    }

    /// Canonical header names, in column order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<SanitizedRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        // A file without a header row has no data rows either.
        if self.headers.is_empty() {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(RowError::Io(e))),
            };
            self.line += 1;
            let cells: Vec<&str> = line.split_whitespace().collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() < self.headers.len() {
                return Some(Err(RowError::ShortRow {
                    line: self.line,
                    expected: self.headers.len(),
                    found: cells.len(),
                }));
            }
            return Some(Ok(SanitizedRow::from_cells(&self.headers, &cells)));
        }
    }
}
