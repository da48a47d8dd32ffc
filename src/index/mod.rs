//! Search structures for one dataset generation.
//!
//! `NameIndex` is the full-text side (company name → registration codes,
//! ranked); `Generation` pairs it with the code → company table built in the
//! same run.

pub mod generation;
pub mod search;

pub use generation::{Generation, GenerationBuilder};
pub use search::{
    MatchMode, NameIndex, NameIndexWriter, SearchHit, SearchOptions, DEFAULT_SEARCH_LIMIT,
};

/// Errors raised while building or opening a name index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Index build failed: {0}")]
    BuildFailed(String),
    #[error("Index reader unavailable: {0}")]
    ReaderFailed(String),
}

impl IndexError {
    pub(crate) fn build(err: impl std::fmt::Display) -> Self {
        Self::BuildFailed(err.to_string())
    }
}
