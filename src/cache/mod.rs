//! Marginalia response cache.
//!
//! Memoizes third-party API responses with time-to-live expiry on top of a
//! string key-value store:
//!
//! - **Session scope**: `MemoryStore`, gone when the process exits
//! - **Persistent scope**: `FileStore`, survives restarts
//!
//! Storage trouble never surfaces to callers. A store that cannot be read or
//! written turns the cache into an always-miss pass-through.

mod clock;
mod config;
mod lock;
mod store;
mod ttl;

use std::sync::Arc;

use tracing::warn;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError, UnavailableStore};
pub use ttl::{CacheEntry, TtlCache};

pub(crate) use ttl::{
    METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_STORE_ERROR,
};

/// The two storage scopes a process works with.
#[derive(Clone)]
pub struct CacheScopes {
    pub session: Arc<dyn KeyValueStore>,
    pub persistent: Arc<dyn KeyValueStore>,
}

impl CacheScopes {
    /// Open both scopes, falling back to disabled persistent storage when the
    /// cache directory cannot be created.
    pub fn open(config: &CacheConfig) -> Self {
        let persistent: Arc<dyn KeyValueStore> = match FileStore::open(&config.directory) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                warn!(
                    target = "marginalia::cache",
                    directory = %config.directory.display(),
                    error = %err,
                    "persistent cache unavailable; continuing without it"
                );
                Arc::new(UnavailableStore)
            }
        };

        Self {
            session: Arc::new(MemoryStore::new()),
            persistent,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            session: Arc::new(MemoryStore::new()),
            persistent: Arc::new(MemoryStore::new()),
        }
    }
}
