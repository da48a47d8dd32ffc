use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::index::Generation;

/// Holds the live generation behind a single swappable reference.
///
/// Readers take one `Arc` per operation and keep using it, so a concurrent
/// `publish` is never observed half-way: they see the old generation or the
/// new one in full. The lock is held only for the clone or the swap.
#[derive(Debug, Default)]
pub struct DatasetStore {
    live: RwLock<Option<Arc<Generation>>>,
    last_id: AtomicU64,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live generation, or `None` before the first successful refresh.
    pub fn current(&self) -> Option<Arc<Generation>> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make `generation` live. The previous one is released once its last
    /// in-flight reader lets go.
    pub fn publish(&self, generation: Generation) {
        let generation = Arc::new(generation);
        let previous = {
            let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
            live.replace(Arc::clone(&generation))
        };
        info!(
            generation = generation.id(),
            companies = generation.len(),
            previous = previous.as_ref().map(|g| g.id()),
            "published dataset generation"
        );
    }

    /// Id for the next generation to be built; strictly increasing.
    pub fn next_generation_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}
