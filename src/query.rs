use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::company::Company;
use crate::index::SearchOptions;
use crate::store::DatasetStore;

/// Summary of the generation currently served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub generation: u64,
    pub companies: usize,
    pub built_at: DateTime<Utc>,
}

/// Read-only access to the live dataset.
///
/// Every call pins one generation for its whole duration, so a search never
/// resolves codes against a table from a different refresh.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<DatasetStore>,
}

impl QueryService {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self { store }
    }

    pub fn lookup(&self, code: &str) -> Option<Arc<Company>> {
        self.store.current()?.lookup(code)
    }

    pub fn search(&self, text: &str, options: &SearchOptions) -> Vec<Arc<Company>> {
        let Some(generation) = self.store.current() else {
            debug!("search before first refresh");
            return Vec::new();
        };
        generation.search(text, options)
    }

    /// `None` until the first refresh has been published.
    pub fn status(&self) -> Option<DatasetStatus> {
        self.store.current().map(|g| DatasetStatus {
            generation: g.id(),
            companies: g.len(),
            built_at: g.built_at(),
        })
    }
}
