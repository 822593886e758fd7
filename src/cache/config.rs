//! Cache configuration.
//!
//! Controls where persistent entries live and how long each kind of response
//! stays fresh, via the `[cache]` table of `marginalia.toml`.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

const DEFAULT_DIRECTORY: &str = ".marginalia/cache";
const DEFAULT_COUNTS_TTL_SECS: u64 = 5 * 60;
const DEFAULT_IDENTITY_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_MENTIONS_TTL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory backing the persistent scope.
    pub directory: PathBuf,
    /// Freshness of engagement counts.
    pub counts_ttl_seconds: u64,
    /// Freshness of handle to identity resolutions.
    pub identity_ttl_seconds: u64,
    /// Freshness of webmention payloads.
    pub mentions_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            counts_ttl_seconds: DEFAULT_COUNTS_TTL_SECS,
            identity_ttl_seconds: DEFAULT_IDENTITY_TTL_SECS,
            mentions_ttl_seconds: DEFAULT_MENTIONS_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn counts_ttl(&self) -> Duration {
        Duration::from_secs(self.counts_ttl_seconds)
    }

    pub fn identity_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_ttl_seconds)
    }

    pub fn mentions_ttl(&self) -> Duration {
        Duration::from_secs(self.mentions_ttl_seconds)
    }
}
