//! Shared fixtures for unit tests.

use std::io::{Cursor, Read, Write};
use std::sync::{mpsc, Mutex};
use tracing_subscriber::{fmt, EnvFilter};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::error::IngestError;
use crate::fetch::ArchiveSource;

pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ariregister=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Deflate-compressed ZIP holding `entries` in order.
pub fn synthetic_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

/// Stored (uncompressed) ZIP as written by a streaming zipper: every local
/// header has flag bit 3 set and zero sizes, with the real CRC and sizes in a
/// data descriptor after the entry body.
pub fn descriptor_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
    const DOS_DATE_1980_01_01: u16 = 0x0021;

    let mut out = Vec::new();
    let mut central = Vec::new();
    for (name, body) in entries {
        let offset = out.len() as u32;
        let crc = crc32(body.as_bytes());
        let size = body.len() as u32;

        put32(&mut out, 0x0403_4b50);
        put16(&mut out, 20);
        put16(&mut out, FLAG_DATA_DESCRIPTOR);
        put16(&mut out, 0);
        put16(&mut out, 0);
        put16(&mut out, DOS_DATE_1980_01_01);
        put32(&mut out, 0);
        put32(&mut out, 0);
        put32(&mut out, 0);
        put16(&mut out, name.len() as u16);
        put16(&mut out, 0);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(body.as_bytes());

        put32(&mut out, 0x0807_4b50);
        put32(&mut out, crc);
        put32(&mut out, size);
        put32(&mut out, size);

        put32(&mut central, 0x0201_4b50);
        put16(&mut central, 20);
        put16(&mut central, 20);
        put16(&mut central, FLAG_DATA_DESCRIPTOR);
        put16(&mut central, 0);
        put16(&mut central, 0);
        put16(&mut central, DOS_DATE_1980_01_01);
        put32(&mut central, crc);
        put32(&mut central, size);
        put32(&mut central, size);
        put16(&mut central, name.len() as u16);
        put16(&mut central, 0);
        put16(&mut central, 0);
        put16(&mut central, 0);
        put16(&mut central, 0);
        put32(&mut central, 0);
        put32(&mut central, offset);
        central.extend_from_slice(name.as_bytes());
    }

    let central_offset = out.len() as u32;
    out.extend_from_slice(&central);
    put32(&mut out, 0x0605_4b50);
    put16(&mut out, 0);
    put16(&mut out, 0);
    put16(&mut out, entries.len() as u16);
    put16(&mut out, entries.len() as u16);
    put32(&mut out, central.len() as u32);
    put32(&mut out, central_offset);
    put16(&mut out, 0);
    out
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// IEEE CRC-32, bitwise.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[test]
fn crc32_matches_check_value() {
    assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
}

/// Serves the same bytes on every open.
pub struct StaticSource(pub Vec<u8>);

impl ArchiveSource for StaticSource {
    fn open(&self) -> Result<Box<dyn Read + Send>, IngestError> {
        Ok(Box::new(Cursor::new(self.0.clone())))
    }

    fn describe(&self) -> String {
        "static archive".to_string()
    }
}

/// Always fails to open.
pub struct FailingSource;

impl ArchiveSource for FailingSource {
    fn open(&self) -> Result<Box<dyn Read + Send>, IngestError> {
        Err(IngestError::network("connection refused"))
    }

    fn describe(&self) -> String {
        "failing source".to_string()
    }
}

/// Blocks in `open` until the paired sender releases it.
pub struct GatedSource {
    gate: Mutex<mpsc::Receiver<()>>,
    payload: Vec<u8>,
}

impl GatedSource {
    pub fn new(payload: Vec<u8>) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                gate: Mutex::new(rx),
                payload,
            },
            tx,
        )
    }
}

impl ArchiveSource for GatedSource {
    fn open(&self) -> Result<Box<dyn Read + Send>, IngestError> {
        self.gate
            .lock()
            .unwrap()
            .recv()
            .map_err(|e| IngestError::network(e.to_string()))?;
        Ok(Box::new(Cursor::new(self.payload.clone())))
    }

    fn describe(&self) -> String {
        "gated archive".to_string()
    }
}

/// The archive from the end-to-end scenario: one company, "Super Company".
pub fn super_company_archive() -> Vec<u8> {
    synthetic_archive(&[(
        "ettevotja_rekvisiidid_test.csv",
        "nimi;ariregistri_kood\nSuper Company;12345678\n",
    )])
}
