//! Error types for the ingestion pipeline.
//!
//! Any of these aborts the current refresh only. The live dataset is never
//! touched by a failed run, and query-time absence is not an error at all.

use thiserror::Error;

use crate::index::IndexError;

/// Errors that can abort a refresh run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The dataset could not be fetched (connect failure, HTTP status, client setup).
    #[error("Network error: {0}")]
    Network(String),

    /// The byte stream failed while being read, or an entry exceeded the size cap.
    #[error("I/O error while streaming archive: {0}")]
    Io(String),

    /// The compressed container is malformed.
    #[error("Archive format error: {0}")]
    ArchiveFormat(String),

    /// The delimited text could not be parsed at all (e.g. unreadable header).
    #[error("Parse error: {0}")]
    Parse(String),

    /// The search structure rejected an insertion or commit.
    #[error("Index error: {0}")]
    Index(String),

    /// No archive entry carried the expected name prefix.
    #[error("No archive entry starting with `{0}`")]
    EntryNotFound(String),

    /// The run completed but produced no companies.
    #[error("Ingestion produced an empty dataset")]
    EmptyDataset,

    /// The blocking ingest task died before returning.
    #[error("Refresh aborted: {0}")]
    Aborted(String),
}

impl IngestError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn archive_format(msg: impl Into<String>) -> Self {
        Self::ArchiveFormat(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e.to_string()),
            other => Self::ArchiveFormat(other.to_string()),
        }
    }
}

impl From<IndexError> for IngestError {
    fn from(err: IndexError) -> Self {
        Self::Index(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Aborted(err.to_string())
    }
}
