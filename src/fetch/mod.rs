// src/fetch/mod.rs
use reqwest::blocking::Client;
use std::io::Read;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::error::IngestError;

/// Where the registry publishes the daily company export.
pub const DEFAULT_DATASET_URL: &str = "https://avaandmed.ariregister.rik.ee/sites/default/files/avaandmed/ettevotja_rekvisiidid__lihtandmed.csv.zip";

/// A producer of archive byte streams.
///
/// `open` is called from a blocking thread once per refresh and must return a
/// fresh stream positioned at the start of the archive.
pub trait ArchiveSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn Read + Send>, IngestError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Streams the archive body of a single HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpArchiveSource {
    url: Url,
    timeout: Option<Duration>,
}

impl HttpArchiveSource {
    /// `timeout` bounds the whole request including the body; `None` disables it.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, IngestError> {
        let url = Url::parse(url).map_err(|e| IngestError::network(format!("{}: {}", url, e)))?;
        Ok(Self { url, timeout })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn open(&self) -> Result<Box<dyn Read + Send>, IngestError> {
        // Built per call: the blocking client must not be created on an async worker.
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| IngestError::network(e.to_string()))?;

        let resp = client
            .get(self.url.as_str())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::network(format!("GET {}: {}", self.url, e)))?;

        info!(
            url = %self.url,
            status = %resp.status(),
            content_length = ?resp.content_length(),
            "dataset response received"
        );
        Ok(Box::new(resp))
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
