//! Time-to-live response cache over a key-value store.

use std::{future::Future, sync::Arc, time::Duration};

use metrics::counter;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use super::clock::{Clock, SystemClock, duration_to_ms};
use super::store::KeyValueStore;

pub(crate) const METRIC_CACHE_HIT: &str = "marginalia_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "marginalia_cache_miss_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "marginalia_cache_expired_total";
pub(crate) const METRIC_CACHE_STORE_ERROR: &str = "marginalia_cache_store_error_total";

/// Stored form of a cached value.
///
/// Entries are never patched; a refetch replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: i64,
    pub expires_at: i64,
}

impl<T> CacheEntry<T> {
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

/// Memoizes JSON-serializable values with bounded staleness.
///
/// Every storage failure degrades to a miss on read and a no-op on write;
/// nothing in here returns an error to the caller except the fetcher's own.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    namespace: String,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), namespace)
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);

        let raw = match self.store.read(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.record(METRIC_CACHE_MISS);
                return None;
            }
            Err(err) => {
                debug!(
                    target = "marginalia::cache",
                    op = "read",
                    key = %storage_key,
                    error = %err,
                    "storage read failed; treating as miss"
                );
                self.record(METRIC_CACHE_STORE_ERROR);
                self.record(METRIC_CACHE_MISS);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(
                    target = "marginalia::cache",
                    op = "decode",
                    key = %storage_key,
                    error = %err,
                    "discarding undecodable cache entry"
                );
                self.discard(&storage_key);
                self.record(METRIC_CACHE_MISS);
                return None;
            }
        };

        if !entry.is_valid_at(self.clock.now_ms()) {
            self.discard(&storage_key);
            self.record(METRIC_CACHE_EXPIRED);
            self.record(METRIC_CACHE_MISS);
            return None;
        }

        self.record(METRIC_CACHE_HIT);
        Some(entry.value)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let storage_key = self.storage_key(key);
        let stored_at = self.clock.now_ms();
        let entry = CacheEntry {
            value,
            stored_at,
            expires_at: stored_at.saturating_add(duration_to_ms(ttl)),
        };

        let serialized = match serde_json::to_string(&entry) {
            Ok(serialized) => serialized,
            Err(err) => {
                debug!(
                    target = "marginalia::cache",
                    op = "encode",
                    key = %storage_key,
                    error = %err,
                    "value could not be serialized; not caching"
                );
                self.record(METRIC_CACHE_STORE_ERROR);
                return;
            }
        };

        if let Err(err) = self.store.write(&storage_key, &serialized) {
            debug!(
                target = "marginalia::cache",
                op = "write",
                key = %storage_key,
                error = %err,
                "storage write failed; skipping cache"
            );
            self.record(METRIC_CACHE_STORE_ERROR);
        }
    }

    pub fn invalidate(&self, key: &str) {
        let storage_key = self.storage_key(key);
        self.discard(&storage_key);
    }

    /// Return the cached value, or run `fetcher` and cache its success.
    ///
    /// Failures are handed back untouched and never cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }

        let value = fetcher().await?;
        self.set(key, &value, ttl);
        Ok(value)
    }

    fn discard(&self, storage_key: &str) {
        if let Err(err) = self.store.remove(storage_key) {
            debug!(
                target = "marginalia::cache",
                op = "remove",
                key = %storage_key,
                error = %err,
                "storage remove failed"
            );
            self.record(METRIC_CACHE_STORE_ERROR);
        }
    }

    fn record(&self, metric: &'static str) {
        counter!(metric, "namespace" => self.namespace.clone()).increment(1);
    }
}
