//! Schema-aware parser for CDN standard access logs
//!
//! Each log file declares its own column layout with a directive line:
//!
//! ```text
//! #Version: 1.0
//! #Fields: date time x-edge-location sc-bytes c-ip ... x-edge-result-type ...
//! 2025-12-29	12:00:01	IAD89-C1	1045	192.0.2.10	...	Hit	...
//! ```
//!
//! The parser streams a file line by line, rebuilding the [`FieldIndex`]
//! whenever it meets a `#Fields:` directive, and classifies every data line
//! by its outcome column. Files ending in `.gz`, or starting with the gzip
//! magic bytes, are inflated on the fly.

use crate::error::{ExplainerError, Result};
use crate::histogram::Histogram;
use crate::models::Outcome;
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Directive that declares the column layout
pub const FIELDS_DIRECTIVE: &str = "#Fields:";

const COMMENT_MARKER: char = '#';
const COLUMN_DELIMITER: char = '\t';
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Longest line accepted before a file is treated as corrupt
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Column name to zero-based position, valid for one file only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    positions: HashMap<String, usize>,
}

impl FieldIndex {
    /// Build an index from a `#Fields:` directive line
    ///
    /// Returns `None` if the line is not a directive or declares no columns.
    /// A name declared twice maps to its last position.
    pub fn from_directive(line: &str) -> Option<Self> {
        let declaration = line.strip_prefix(FIELDS_DIRECTIVE)?;
        let positions: HashMap<String, usize> = declaration
            .split_whitespace()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        if positions.is_empty() {
            None
        } else {
            Some(FieldIndex { positions })
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Value of column `name` on a split line
    ///
    /// Undeclared columns and positions past the end of a short line are
    /// both reported as absent.
    pub fn value<'a>(&self, columns: &[&'a str], name: &str) -> Option<&'a str> {
        self.position(name).and_then(|idx| columns.get(idx).copied())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Counts contributed by one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub histogram: Histogram,
    /// Data lines seen, i.e. lines that were neither blank nor comments
    pub data_lines: u64,
}

/// Extracts cache outcomes from log files
#[derive(Debug, Clone)]
pub struct LogParser {
    primary_field: String,
    fallback_field: String,
}

impl Default for LogParser {
    fn default() -> Self {
        LogParser::new("x-edge-result-type", "x-edge-response-result-type")
    }
}

impl LogParser {
    /// Create a parser reading `primary_field`, then `fallback_field`
    pub fn new(primary_field: impl Into<String>, fallback_field: impl Into<String>) -> Self {
        LogParser {
            primary_field: primary_field.into(),
            fallback_field: fallback_field.into(),
        }
    }

    /// Classify one data line under the active index
    pub fn classify(&self, index: Option<&FieldIndex>, line: &str) -> Outcome {
        let index = match index {
            Some(index) => index,
            None => return Outcome::NoFieldsHeader,
        };

        let columns: Vec<&str> = line.split(COLUMN_DELIMITER).collect();
        let primary = index.value(&columns, &self.primary_field).unwrap_or("");
        let value = if primary.is_empty() {
            index.value(&columns, &self.fallback_field).unwrap_or("")
        } else {
            primary
        };

        Outcome::classify(value)
    }

    /// Parse an already-decompressed text stream
    ///
    /// Invalid UTF-8 is replaced rather than rejected. An I/O error, or a line
    /// longer than [`MAX_LINE_BYTES`], aborts the stream and the counts
    /// gathered so far are dropped with it.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> io::Result<FileSummary> {
        let mut summary = FileSummary::default();
        let mut index: Option<FieldIndex> = None;
        let mut buf = Vec::with_capacity(1024);

        loop {
            buf.clear();
            let limit = MAX_LINE_BYTES as u64 + 1;
            if reader.by_ref().take(limit).read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            if buf.len() as u64 == limit && buf.last() != Some(&b'\n') {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {} bytes", MAX_LINE_BYTES),
                ));
            }

            let raw = String::from_utf8_lossy(&buf);
            let line = raw.trim_end_matches('\n').trim_end_matches('\r');

            if line.starts_with(FIELDS_DIRECTIVE) {
                index = FieldIndex::from_directive(line);
                debug!(
                    "Fields directive declares {} columns",
                    index.as_ref().map_or(0, FieldIndex::len)
                );
                continue;
            }

            if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                continue;
            }

            summary.data_lines += 1;
            summary.histogram.record(&self.classify(index.as_ref(), line));
        }

        Ok(summary)
    }

    /// Parse one local log file, inflating it if it is gzip-compressed
    ///
    /// # Returns
    /// * `Ok(FileSummary)` with the file's counts
    /// * `Err(ExplainerError::Decode)` if the file cannot be opened or its
    ///   compressed stream is corrupt
    pub fn parse_file(&self, path: &Path) -> Result<FileSummary> {
        let file = File::open(path)
            .map_err(|e| ExplainerError::decode(path, format!("Cannot open: {}", e)))?;
        let mut reader = BufReader::new(file);

        let compressed = has_gz_extension(path)
            || reader
                .fill_buf()
                .map(|head| head.starts_with(&GZIP_MAGIC))
                .map_err(|e| ExplainerError::decode(path, e.to_string()))?;

        debug!("Parsing {} (gzip={})", path.display(), compressed);

        let result = if compressed {
            self.parse_reader(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            self.parse_reader(reader)
        };

        result.map_err(|e| ExplainerError::decode(path, e.to_string()))
    }
}

fn has_gz_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}
