use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::engagement::METRIC_FETCH_ERROR;
use crate::cache::{
    METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_STORE_ERROR,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;
use super::social::METRIC_FETCH_MS;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of response-cache hits."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of response-cache misses, including expired and unreadable entries."
        );
        describe_counter!(
            METRIC_CACHE_EXPIRED,
            Unit::Count,
            "Total number of cache entries discarded after their TTL elapsed."
        );
        describe_counter!(
            METRIC_CACHE_STORE_ERROR,
            Unit::Count,
            "Total number of key-value storage failures absorbed by the cache."
        );
        describe_counter!(
            METRIC_FETCH_ERROR,
            Unit::Count,
            "Total number of failed third-party fetches, by source."
        );
        describe_histogram!(
            METRIC_FETCH_MS,
            Unit::Milliseconds,
            "Third-party fetch latency in milliseconds."
        );
    });
}
