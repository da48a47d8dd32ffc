//! Periodic dataset refresh.
//!
//! A run walks Idle → Fetching → Indexing → Publishing → Idle. A failure in
//! Fetching or Indexing passes through IdleFailed and back to Idle without
//! touching the live dataset. Only one run is ever outside Idle; a trigger
//! that arrives meanwhile is skipped, not queued.

use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::{error, info, instrument, warn};

use crate::error::IngestError;
use crate::fetch::ArchiveSource;
use crate::process::archive::ArchiveReader;
use crate::process::ingest::{index_archive, IngestOptions, IngestReport};
use crate::store::DatasetStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Indexing,
    Publishing,
    IdleFailed,
}

impl RefreshPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPhase::Idle => "idle",
            RefreshPhase::Fetching => "fetching",
            RefreshPhase::Indexing => "indexing",
            RefreshPhase::Publishing => "publishing",
            RefreshPhase::IdleFailed => "idle_failed",
        }
    }
}

/// What a single trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published {
        generation: u64,
        report: IngestReport,
    },
    /// Another run was already in progress.
    Skipped,
    Failed(IngestError),
}

/// Cumulative counters across runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStats {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_report: Option<IngestReport>,
}

pub struct RefreshScheduler {
    source: Arc<dyn ArchiveSource>,
    store: Arc<DatasetStore>,
    options: IngestOptions,
    interval: Duration,
    phase: Arc<watch::Sender<RefreshPhase>>,
    stats: Mutex<RefreshStats>,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn ArchiveSource>,
        store: Arc<DatasetStore>,
        options: IngestOptions,
        interval: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(RefreshPhase::Idle);
        Self {
            source,
            store,
            options,
            interval,
            phase: Arc::new(phase),
            stats: Mutex::new(RefreshStats::default()),
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    pub fn subscribe(&self) -> watch::Receiver<RefreshPhase> {
        self.phase.subscribe()
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Refresh now and every `interval` after that, forever.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.run_on(IntervalStream::new(interval)).await;
    }

    /// Trigger a refresh for every item of `ticks`; returns when the stream ends.
    ///
    /// Each run is spawned so that a slow refresh never delays the tick source;
    /// ticks landing on a busy scheduler are skipped.
    pub async fn run_on<S>(self: Arc<Self>, ticks: S)
    where
        S: Stream + Unpin,
    {
        info!(
            source = %self.source.describe(),
            interval = ?self.interval,
            "refresh scheduler started"
        );
        let mut ticks = ticks;
        while ticks.next().await.is_some() {
            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                scheduler.run_once().await;
            });
        }
        info!("refresh tick source ended");
    }

    /// One full refresh, or a no-op if one is already running.
    #[instrument(level = "info", skip(self))]
    pub async fn run_once(&self) -> RefreshOutcome {
        if !self.try_begin() {
            warn!(phase = self.phase().as_str(), "refresh already running; skipping");
            self.update_stats(|s| s.skipped += 1);
            return RefreshOutcome::Skipped;
        }
        self.update_stats(|s| s.started += 1);

        let start = Instant::now();
        let id = self.store.next_generation_id();
        let source = Arc::clone(&self.source);
        let options = self.options.clone();
        let phase = Arc::clone(&self.phase);

        let built = tokio::task::spawn_blocking(move || {
            let archive = ArchiveReader::spool(source.open()?, options.max_entry_bytes)?;
            phase.send_replace(RefreshPhase::Indexing);
            index_archive(archive, id, &options)
        })
        .await
        .map_err(IngestError::from)
        .and_then(|r| r);

        match built {
            Ok((generation, report)) => {
                self.phase.send_replace(RefreshPhase::Publishing);
                self.store.publish(generation);
                self.update_stats(|s| {
                    s.completed += 1;
                    s.last_success_at = Some(Utc::now());
                    s.last_report = Some(report.clone());
                });
                self.phase.send_replace(RefreshPhase::Idle);
                info!(
                    generation = id,
                    companies = report.companies,
                    elapsed = ?start.elapsed(),
                    "refresh complete"
                );
                RefreshOutcome::Published {
                    generation: id,
                    report,
                }
            }
            Err(e) => {
                self.phase.send_replace(RefreshPhase::IdleFailed);
                error!(error = %e, elapsed = ?start.elapsed(), "refresh failed; keeping live dataset");
                self.update_stats(|s| {
                    s.failed += 1;
                    s.last_error = Some(e.to_string());
                });
                self.phase.send_replace(RefreshPhase::Idle);
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Idle → Fetching as one step; false if a run is already in progress.
    fn try_begin(&self) -> bool {
        self.phase.send_if_modified(|phase| match phase {
            RefreshPhase::Idle | RefreshPhase::IdleFailed => {
                *phase = RefreshPhase::Fetching;
                true
            }
            _ => false,
        })
    }

    fn update_stats(&self, f: impl FnOnce(&mut RefreshStats)) {
        f(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}
