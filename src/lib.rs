//! Estonian business registry ingest and search.
//!
//! A [`RefreshScheduler`] periodically streams the registry's daily company
//! export, translates each row and builds a new [`Generation`]; the
//! [`DatasetStore`] swaps it in whole, and [`QueryService`] answers lookups and
//! name searches against whichever generation is live.

pub mod company;
pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod process;
pub mod query;
pub mod refresh;
pub mod server;
pub mod store;

#[cfg(test)]
mod test_support;

pub use company::{Company, CompanyField};
pub use config::Config;
pub use error::IngestError;
pub use fetch::{ArchiveSource, HttpArchiveSource};
pub use index::{Generation, MatchMode, SearchOptions};
pub use process::{build_generation, IngestOptions, IngestReport};
pub use query::{DatasetStatus, QueryService};
pub use refresh::{RefreshOutcome, RefreshPhase, RefreshScheduler, RefreshStats};
pub use store::DatasetStore;
