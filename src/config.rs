//! Service configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::fetch::DEFAULT_DATASET_URL;
use crate::index::DEFAULT_SEARCH_LIMIT;
use crate::process::ingest::{IngestOptions, DEFAULT_ENTRY_PREFIX};

const DEFAULT_PORT: u16 = 80;

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 24 * 60 * 60;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30 * 60;

const DEFAULT_MAX_ENTRY_BYTES: u64 = 4 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub refresh_interval: Duration,
    pub dataset_url: String,
    pub entry_prefix: String,
    /// `None` means the fetch may take as long as it takes.
    pub fetch_timeout: Option<Duration>,
    pub max_entry_bytes: u64,
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            entry_prefix: DEFAULT_ENTRY_PREFIX.to_string(),
            fetch_timeout: Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `PORT`: listen port (default: 80)
    /// - `REFRESH_INTERVAL_SECS`: seconds between refreshes (default: 86400)
    /// - `DATASET_URL`: archive location (default: the registry's daily export)
    /// - `DATASET_ENTRY_PREFIX`: archive entry to parse (default: ettevotja_rekvisiidid)
    /// - `FETCH_TIMEOUT_SECS`: whole-download timeout, 0 disables (default: 1800)
    /// - `MAX_ENTRY_BYTES`: decompressed size cap per entry (default: 4 GiB)
    /// - `SEARCH_LIMIT`: maximum search results (default: 100)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let refresh_secs = parse_or(&lookup, "REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS)?;
        if refresh_secs == 0 {
            anyhow::bail!("REFRESH_INTERVAL_SECS must be greater than zero");
        }

        let timeout_secs = parse_or(&lookup, "FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;

        let search_limit = parse_or(&lookup, "SEARCH_LIMIT", DEFAULT_SEARCH_LIMIT)?;
        if search_limit == 0 {
            anyhow::bail!("SEARCH_LIMIT must be greater than zero");
        }

        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            refresh_interval: Duration::from_secs(refresh_secs),
            dataset_url: lookup("DATASET_URL").unwrap_or(defaults.dataset_url),
            entry_prefix: lookup("DATASET_ENTRY_PREFIX").unwrap_or(defaults.entry_prefix),
            fetch_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_entry_bytes: parse_or(&lookup, "MAX_ENTRY_BYTES", DEFAULT_MAX_ENTRY_BYTES)?,
            search_limit,
        })
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            entry_prefix: self.entry_prefix.clone(),
            max_entry_bytes: self.max_entry_bytes,
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
