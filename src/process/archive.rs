// src/process/archive.rs
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::Instant;
use tracing::debug;
use zip::ZipArchive;

use crate::error::IngestError;

/// Walks the entries of a ZIP archive in central-directory order.
///
/// Entry sizes come from the central directory, so archives whose local
/// headers defer sizes to a trailing data descriptor read like any other.
pub struct ArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    max_entry_bytes: u64,
    next: usize,
}

impl ArchiveReader<File> {
    /// Copy `source` into an anonymous temporary file and open that.
    ///
    /// The file is removed by the OS once the reader is dropped.
    pub fn spool<S: Read>(mut source: S, max_entry_bytes: u64) -> Result<Self, IngestError> {
        let start = Instant::now();
        let mut file = tempfile::tempfile()?;
        let bytes = io::copy(&mut source, &mut file)?;
        file.seek(SeekFrom::Start(0))?;
        debug!(bytes, elapsed = ?start.elapsed(), "archive spooled to disk");
        Self::new(file, max_entry_bytes)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(inner: R, max_entry_bytes: u64) -> Result<Self, IngestError> {
        let archive = ZipArchive::new(inner)?;
        Ok(Self {
            archive,
            max_entry_bytes,
            next: 0,
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Next entry, or `None` after the last one.
    ///
    /// The returned entry borrows the archive; drop it before asking for the next.
    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>, IngestError> {
        if self.next >= self.archive.len() {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;

        let file = self.archive.by_index(index)?;
        let name = file.name().to_string();
        debug!(entry = %name, size = file.size(), "archive entry");
        Ok(Some(ArchiveEntry {
            name,
            reader: Box::new(CappedReader::new(file, self.max_entry_bytes)),
        }))
    }

    pub fn entries_seen(&self) -> u64 {
        self.next as u64
    }
}

/// One decompressed archive member.
pub struct ArchiveEntry<'a> {
    name: String,
    reader: Box<dyn Read + 'a>,
}

impl<'a> ArchiveEntry<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read and discard the rest of the entry, returning the number of bytes skipped.
    pub fn drain(mut self) -> Result<u64, IngestError> {
        Ok(io::copy(&mut self.reader, &mut io::sink())?)
    }
}

impl Read for ArchiveEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Fails the read once more than `limit` bytes have come through.
struct CappedReader<R> {
    inner: R,
    limit: u64,
    read: u64,
}

impl<R: Read> CappedReader<R> {
    fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            read: 0,
        }
    }
}

impl<R: Read> Read for CappedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        if self.read > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("archive entry exceeds {} bytes", self.limit),
            ));
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{descriptor_archive, synthetic_archive};
    use std::io::Cursor;

    /// Hides `Seek` so only the spooling path can open it.
    struct OneWay(Cursor<Vec<u8>>);

    impl Read for OneWay {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    fn contents<R: Read + Seek>(archive: &mut ArchiveReader<R>) -> Vec<(String, String)> {
        let mut seen = Vec::new();
        while let Some(mut entry) = archive.next_entry().unwrap() {
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            seen.push((entry.name().to_string(), body));
        }
        seen
    }

    #[test]
    fn entries_are_yielded_in_order_with_contents() {
        let zip = synthetic_archive(&[("first.txt", "one"), ("second.csv", "a;b\n1;2\n")]);
        let mut archive = ArchiveReader::new(Cursor::new(zip), u64::MAX).unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(
            contents(&mut archive),
            vec![
                ("first.txt".to_string(), "one".to_string()),
                ("second.csv".to_string(), "a;b\n1;2\n".to_string()),
            ]
        );
        assert_eq!(archive.entries_seen(), 2);
        assert!(archive.next_entry().unwrap().is_none());
    }

    #[test]
    fn drained_and_dropped_entries_do_not_disturb_later_ones() {
        let zip = synthetic_archive(&[
            ("skip_me.bin", "x".repeat(10_000).as_str()),
            ("drop_me.bin", "y".repeat(10_000).as_str()),
            ("keep.csv", "kept"),
        ]);
        let mut archive = ArchiveReader::new(Cursor::new(zip), u64::MAX).unwrap();

        let first = archive.next_entry().unwrap().unwrap();
        assert_eq!(first.drain().unwrap(), 10_000);

        let second = archive.next_entry().unwrap().unwrap();
        assert_eq!(second.name(), "drop_me.bin");
        drop(second);

        let mut third = archive.next_entry().unwrap().unwrap();
        let mut body = String::new();
        third.read_to_string(&mut body).unwrap();
        assert_eq!(body, "kept");
    }

    #[test]
    fn sizes_in_trailing_data_descriptor_are_read() {
        let zip = descriptor_archive(&[
            ("readme.txt", "hello"),
            ("ettevotja_rekvisiidid_test.csv", "nimi;ariregistri_kood\nSuper Company;12345678\n"),
        ]);
        // General purpose flag bit 3 on the first local header.
        assert_eq!(zip[6] & 0x08, 0x08);

        let mut archive = ArchiveReader::spool(OneWay(Cursor::new(zip)), u64::MAX).unwrap();
        assert_eq!(
            contents(&mut archive),
            vec![
                ("readme.txt".to_string(), "hello".to_string()),
                (
                    "ettevotja_rekvisiidid_test.csv".to_string(),
                    "nimi;ariregistri_kood\nSuper Company;12345678\n".to_string()
                ),
            ]
        );
    }

    #[test]
    fn spooled_stream_reads_like_a_seekable_one() {
        let zip = synthetic_archive(&[("a.csv", "1"), ("b.csv", "2")]);
        let mut spooled = ArchiveReader::spool(OneWay(Cursor::new(zip.clone())), u64::MAX).unwrap();
        let mut direct = ArchiveReader::new(Cursor::new(zip), u64::MAX).unwrap();
        assert_eq!(contents(&mut spooled), contents(&mut direct));
    }

    #[test]
    fn failing_stream_is_an_io_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }
        assert!(matches!(
            ArchiveReader::spool(Broken, u64::MAX),
            Err(IngestError::Io(_))
        ));
    }

    #[test]
    fn oversized_entry_is_an_io_error() {
        let zip = synthetic_archive(&[("big.csv", "z".repeat(4096).as_str())]);
        let mut archive = ArchiveReader::new(Cursor::new(zip), 1024).unwrap();
        let entry = archive.next_entry().unwrap().unwrap();
        assert!(matches!(entry.drain(), Err(IngestError::Io(_))));
    }

    #[test]
    fn garbage_is_an_archive_format_error() {
        let garbage = b"definitely not a zip archive, just plain text padding".to_vec();
        assert!(matches!(
            ArchiveReader::new(Cursor::new(garbage), 1024),
            Err(IngestError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn truncated_archive_is_rejected() {
        let mut zip = synthetic_archive(&[("cut.csv", "q".repeat(50_000).as_str())]);
        zip.truncate(zip.len() / 2);
        assert!(ArchiveReader::spool(OneWay(Cursor::new(zip)), u64::MAX).is_err());
    }
}
