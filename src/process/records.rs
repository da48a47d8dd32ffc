// src/process/records.rs
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use serde::ser::{Serialize, Serializer};
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::IngestError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Field delimiter used by the registry exports.
pub const DELIMITER: u8 = b';';

/// One CSV row keyed by the header-derived column names, in column order.
///
/// Column names are shared by every row of the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl RawRecord {
    pub fn new(columns: Arc<[String]>, values: Vec<String>) -> Self {
        Self { columns, values }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for RawRecord {
    fn default() -> Self {
        Self::new(Arc::from(Vec::new()), Vec::new())
    }
}

impl Serialize for RawRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Lazy, single-pass reader of `;`-delimited rows with a header line.
///
/// A leading UTF-8 BOM is stripped. Rows whose field count differs from the
/// header, or that are not valid UTF-8, are skipped and counted; a failure of
/// the underlying stream ends the sequence with an error.
pub struct RecordParser<R: Read> {
    reader: csv::Reader<BufReader<R>>,
    columns: Arc<[String]>,
    record: StringRecord,
    rows_read: u64,
    skipped_rows: u64,
    done: bool,
}

impl<R: Read> RecordParser<R> {
    pub fn new(source: R) -> Result<Self, IngestError> {
        let mut source = BufReader::new(source);
        if source.fill_buf()?.starts_with(UTF8_BOM) {
            source.consume(UTF8_BOM.len());
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .flexible(false)
            .from_reader(source);

        let columns: Vec<String> = match reader.headers() {
            Ok(headers) => headers.iter().map(str::to_string).collect(),
            Err(e) => return Err(classify(e)),
        };
        debug!(columns = columns.len(), "parsed CSV header");

        Ok(Self {
            reader,
            columns: columns.into(),
            record: StringRecord::new(),
            rows_read: 0,
            skipped_rows: 0,
            done: false,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Malformed rows skipped so far.
    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }
}

impl<R: Read> Iterator for RecordParser<R> {
    type Item = Result<RawRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Ok(true) => {
                    self.rows_read += 1;
                    let values = self.record.iter().map(str::to_string).collect();
                    return Some(Ok(RawRecord::new(Arc::clone(&self.columns), values)));
                }
                Err(e) if is_row_level(&e) => {
                    self.skipped_rows += 1;
                    warn!(error = %e, skipped = self.skipped_rows, "skipping malformed row");
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(classify(e)));
                }
            }
        }
    }
}

fn is_row_level(err: &csv::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::UnequalLengths { .. } | ErrorKind::Utf8 { .. }
    )
}

fn classify(err: csv::Error) -> IngestError {
    match err.into_kind() {
        ErrorKind::Io(e) => IngestError::from(e),
        other => IngestError::parse(format!("{:?}", other)),
    }
}
