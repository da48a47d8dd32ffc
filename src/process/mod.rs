// src/process/mod.rs
//! Archive → records → companies → generation.
//!
//! Everything here is synchronous and pull-based; the refresh scheduler runs
//! it on a blocking thread. The archive is spooled to a temporary file first
//! so entries can be read through the central directory.

pub mod archive;
pub mod ingest;
pub mod records;
pub mod translate;

pub use archive::ArchiveReader;
pub use ingest::{build_generation, index_archive, IngestOptions, IngestReport};
