// src/process/ingest.rs
use serde::Serialize;
use std::io::{Read, Seek};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::IngestError;
use crate::index::{Generation, GenerationBuilder};
use crate::process::archive::{ArchiveEntry, ArchiveReader};
use crate::process::records::RecordParser;
use crate::process::translate::translate;

/// Name prefix of the archive entry holding the company table.
pub const DEFAULT_ENTRY_PREFIX: &str = "ettevotja_rekvisiidid";

/// Log a progress line every this many companies.
const PROGRESS_EVERY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Only entries whose name starts with this are parsed; the rest are drained.
    pub entry_prefix: String,
    /// Per-entry cap on decompressed bytes.
    pub max_entry_bytes: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            entry_prefix: DEFAULT_ENTRY_PREFIX.to_string(),
            max_entry_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub entries_seen: u64,
    pub entries_skipped: u64,
    pub rows_read: u64,
    pub rows_malformed: u64,
    pub rows_missing_code: u64,
    pub duplicate_codes: u64,
    pub companies: usize,
}

/// Spool an archive stream, parse the matching entries and build a complete generation.
///
/// Nothing is published here; the caller decides what to do with the result.
pub fn build_generation<R: Read>(
    source: R,
    id: u64,
    options: &IngestOptions,
) -> Result<(Generation, IngestReport), IngestError> {
    let archive = ArchiveReader::spool(source, options.max_entry_bytes)?;
    index_archive(archive, id, options)
}

/// Build a generation from an already opened archive.
#[instrument(level = "info", skip(archive, options))]
pub fn index_archive<R: Read + Seek>(
    mut archive: ArchiveReader<R>,
    id: u64,
    options: &IngestOptions,
) -> Result<(Generation, IngestReport), IngestError> {
    let start = Instant::now();
    let mut builder = GenerationBuilder::new(id)?;
    let mut report = IngestReport::default();
    let mut matched = false;

    while let Some(entry) = archive.next_entry()? {
        if !entry.name().starts_with(&options.entry_prefix) {
            let name = entry.name().to_string();
            let skipped = entry.drain()?;
            debug!(entry = %name, bytes = skipped, "drained unrelated entry");
            report.entries_skipped += 1;
            continue;
        }

        matched = true;
        info!(entry = %entry.name(), "indexing entry");
        index_entry(entry, &mut builder, &mut report)?;
    }
    report.entries_seen = archive.entries_seen();

    if !matched {
        return Err(IngestError::EntryNotFound(options.entry_prefix.clone()));
    }
    if builder.is_empty() {
        return Err(IngestError::EmptyDataset);
    }

    report.duplicate_codes = builder.duplicates();
    report.companies = builder.len();
    let generation = builder.finish()?;

    info!(
        companies = report.companies,
        malformed = report.rows_malformed,
        missing_code = report.rows_missing_code,
        duplicates = report.duplicate_codes,
        elapsed = ?start.elapsed(),
        "generation built"
    );
    Ok((generation, report))
}

fn index_entry(
    entry: ArchiveEntry<'_>,
    builder: &mut GenerationBuilder,
    report: &mut IngestReport,
) -> Result<(), IngestError> {
    let mut records = RecordParser::new(entry)?;

    for raw in records.by_ref() {
        let company = translate(raw?);
        if !company.has_code() {
            report.rows_missing_code += 1;
            continue;
        }
        builder.insert(company)?;

        if builder.len() % PROGRESS_EVERY == 0 {
            info!("Indexed {} companies", builder.len());
        }
    }

    report.rows_read += records.rows_read();
    report.rows_malformed += records.skipped_rows();
    if records.skipped_rows() > 0 {
        warn!(skipped = records.skipped_rows(), "malformed rows skipped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SearchOptions;
    use crate::test_support::{descriptor_archive, init_test_logging, synthetic_archive};
    use std::io::Cursor;

    fn build(entries: &[(&str, &str)]) -> Result<(Generation, IngestReport), IngestError> {
        init_test_logging();
        build_generation(
            Cursor::new(synthetic_archive(entries)),
            1,
            &IngestOptions::default(),
        )
    }

    #[test]
    fn single_row_archive_is_searchable() {
        let (generation, report) = build(&[(
            "ettevotja_rekvisiidid_test.csv",
            "nimi;ariregistri_kood\nSuper Company;12345678\n",
        )])
        .unwrap();

        assert_eq!(report.companies, 1);
        let company = generation.lookup("12345678").unwrap();
        assert_eq!(company.name, "Super Company");

        let hits = generation.search("Super", &SearchOptions::default());
        assert_eq!(hits[0].registration_code, "12345678");
    }

    #[test]
    fn streamed_archive_with_data_descriptors_is_indexed() {
        init_test_logging();
        let archive = descriptor_archive(&[(
            "ettevotja_rekvisiidid_test.csv",
            "nimi;ariregistri_kood\nSuper Company;12345678\n",
        )]);
        let (generation, report) =
            build_generation(Cursor::new(archive), 1, &IngestOptions::default()).unwrap();

        assert_eq!(report.companies, 1);
        assert_eq!(generation.lookup("12345678").unwrap().name, "Super Company");
    }

    #[test]
    fn unrelated_entries_are_drained_around_the_target() {
        let (generation, report) = build(&[
            ("readme.txt", "not a csv at all"),
            (
                "ettevotja_rekvisiidid__lihtandmed.csv",
                "\u{feff}nimi;ariregistri_kood;kmkr_nr\nAlfa OÜ;111;EE1\nBeta AS;222;\n",
            ),
            ("trailer.bin", "zzzz"),
        ])
        .unwrap();

        assert_eq!(report.entries_seen, 3);
        assert_eq!(report.entries_skipped, 2);
        assert_eq!(generation.len(), 2);
        assert_eq!(generation.lookup("111").unwrap().vat_number.as_deref(), Some("EE1"));
    }

    #[test]
    fn dirty_rows_are_counted_not_fatal() {
        let (generation, report) = build(&[(
            "ettevotja_rekvisiidid.csv",
            "nimi;ariregistri_kood\nGood;1\nbroken row\nNo Code;\nGood Again;2\nGood Again Later;2\n",
        )])
        .unwrap();

        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_malformed, 1);
        assert_eq!(report.rows_missing_code, 1);
        assert_eq!(report.duplicate_codes, 1);
        assert_eq!(generation.len(), 2);
        assert_eq!(generation.lookup("2").unwrap().name, "Good Again Later");
    }

    #[test]
    fn missing_target_entry_fails() {
        let err = build(&[("something_else.csv", "nimi;ariregistri_kood\nA;1\n")]).unwrap_err();
        assert_eq!(err, IngestError::EntryNotFound(DEFAULT_ENTRY_PREFIX.into()));
    }

    #[test]
    fn header_only_entry_fails_as_empty() {
        let err = build(&[("ettevotja_rekvisiidid.csv", "nimi;ariregistri_kood\n")]).unwrap_err();
        assert_eq!(err, IngestError::EmptyDataset);
    }

    #[test]
    fn corrupt_archive_fails() {
        init_test_logging();
        let err = build_generation(
            Cursor::new(b"PK\x03\x04 this is not really a zip archive at all".to_vec()),
            1,
            &IngestOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IngestError::ArchiveFormat(_) | IngestError::Io(_)
        ));
    }
}
