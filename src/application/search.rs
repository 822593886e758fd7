//! Debounce for search-as-you-type input.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Collapses bursts of keystrokes into one filter pass.
///
/// Every call to [`Debouncer::settle`] takes a ticket; only the holder of the
/// newest ticket is told to proceed once the delay has elapsed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the delay. Returns `false` if a newer input superseded this one.
    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Wait out the delay and hand back `query` if it is still current.
    pub async fn debounce(&self, query: String) -> Option<String> {
        self.settle().await.then_some(query)
    }

    /// Drop any pending input.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}
