//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, EngagementArgs, GlobalOverrides, ListArgs, MentionsArgs};

use crate::application::listing::PagingMode;
use crate::application::parse::{DEFAULT_LIST_SELECTOR, ListSelectors};
use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "marginalia";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const DEFAULT_BLUESKY_API: &str = "https://public.api.bsky.app/";
const DEFAULT_WEBMENTION_API: &str = "https://webmention.io/";
const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_INITIAL_LOAD: u64 = 20;
const DEFAULT_STEP: u64 = 10;
const DEFAULT_THRESHOLD_PX: f64 = 200.0;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheConfig,
    pub http: HttpSettings,
    pub endpoints: EndpointSettings,
    pub listing: ListingSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct EndpointSettings {
    /// Required only by the engagement command.
    pub mappings_url: Option<Url>,
    pub bluesky_api: Url,
    pub webmention_api: Url,
}

#[derive(Debug, Clone)]
pub struct ListingSettings {
    pub mode: PagingMode,
    pub threshold_px: f64,
    pub selectors: ListSelectors,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MARGINALIA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    match &cli.command {
        Command::List(args) => raw.apply_list_overrides(args),
        Command::Engagement(args) => raw.apply_engagement_overrides(args),
        Command::Mentions(_) => {}
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    http: RawHttpSettings,
    endpoints: RawEndpointSettings,
    listing: RawListingSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(directory) = overrides.cache_directory.as_ref() {
            self.cache.directory = Some(directory.clone());
        }
        if let Some(seconds) = overrides.http_timeout_seconds {
            self.http.timeout_seconds = Some(seconds);
        }
    }

    fn apply_list_overrides(&mut self, args: &ListArgs) {
        if args.incremental || args.shown.is_some() {
            self.listing.mode = Some("incremental".to_string());
        }
        if let Some(size) = args.page_size {
            self.listing.page_size = Some(size as u64);
        }
        if let Some(selector) = args.selector.as_ref() {
            self.listing.selector = Some(selector.clone());
        }
    }

    fn apply_engagement_overrides(&mut self, args: &EngagementArgs) {
        if let Some(url) = args.mappings_url.as_ref() {
            self.endpoints.mappings_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            http,
            endpoints,
            listing,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let http = build_http_settings(http)?;
        let endpoints = build_endpoint_settings(endpoints)?;
        let listing = build_listing_settings(listing)?;

        Ok(Self {
            logging,
            cache,
            http,
            endpoints,
            listing,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheConfig, LoadError> {
    let defaults = CacheConfig::default();
    let directory = cache.directory.unwrap_or(defaults.directory);
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid("cache.directory", "must not be empty"));
    }

    Ok(CacheConfig {
        directory,
        counts_ttl_seconds: positive_seconds(
            cache.counts_ttl_seconds,
            defaults.counts_ttl_seconds,
            "cache.counts_ttl_seconds",
        )?,
        identity_ttl_seconds: positive_seconds(
            cache.identity_ttl_seconds,
            defaults.identity_ttl_seconds,
            "cache.identity_ttl_seconds",
        )?,
        mentions_ttl_seconds: positive_seconds(
            cache.mentions_ttl_seconds,
            defaults.mentions_ttl_seconds,
            "cache.mentions_ttl_seconds",
        )?,
    })
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let timeout_seconds = positive_seconds(
        http.timeout_seconds,
        DEFAULT_HTTP_TIMEOUT_SECS,
        "http.timeout_seconds",
    )?;

    let user_agent = match http.user_agent {
        Some(value) if value.trim().is_empty() => {
            return Err(LoadError::invalid("http.user_agent", "must not be empty"));
        }
        Some(value) => value.trim().to_string(),
        None => concat!("marginalia/", env!("CARGO_PKG_VERSION")).to_string(),
    };

    Ok(HttpSettings {
        timeout: Duration::from_secs(timeout_seconds),
        user_agent,
    })
}

fn build_endpoint_settings(endpoints: RawEndpointSettings) -> Result<EndpointSettings, LoadError> {
    let mappings_url = endpoints
        .mappings_url
        .filter(|value| !value.trim().is_empty())
        .map(|value| parse_http_url(&value, "endpoints.mappings_url"))
        .transpose()?;

    let bluesky_api = parse_base_url(
        endpoints.bluesky_api.as_deref().unwrap_or(DEFAULT_BLUESKY_API),
        "endpoints.bluesky_api",
    )?;
    let webmention_api = parse_base_url(
        endpoints
            .webmention_api
            .as_deref()
            .unwrap_or(DEFAULT_WEBMENTION_API),
        "endpoints.webmention_api",
    )?;

    Ok(EndpointSettings {
        mappings_url,
        bluesky_api,
        webmention_api,
    })
}

fn build_listing_settings(listing: RawListingSettings) -> Result<ListingSettings, LoadError> {
    let mode = match listing.mode.as_deref().map(str::trim) {
        None | Some("paged") => PagingMode::Paged {
            page_size: non_zero_usize(
                listing.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
                "listing.page_size",
            )?,
        },
        Some("incremental") => PagingMode::Incremental {
            initial: non_zero_usize(
                listing.initial_load.unwrap_or(DEFAULT_INITIAL_LOAD),
                "listing.initial_load",
            )?,
            step: non_zero_usize(listing.step.unwrap_or(DEFAULT_STEP), "listing.step")?,
        },
        Some(other) => {
            return Err(LoadError::invalid(
                "listing.mode",
                format!("expected `paged` or `incremental`, got `{other}`"),
            ));
        }
    };

    let threshold_px = listing.threshold_px.unwrap_or(DEFAULT_THRESHOLD_PX);
    if !threshold_px.is_finite() || threshold_px < 0.0 {
        return Err(LoadError::invalid(
            "listing.threshold_px",
            "must be a non-negative number",
        ));
    }

    let selectors = ListSelectors::new(
        listing
            .selector
            .as_deref()
            .unwrap_or(DEFAULT_LIST_SELECTOR),
    )
    .map_err(|err| LoadError::invalid("listing.selector", err.to_string()))?;

    Ok(ListingSettings {
        mode,
        threshold_px,
        selectors,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    directory: Option<PathBuf>,
    counts_ttl_seconds: Option<u64>,
    identity_ttl_seconds: Option<u64>,
    mentions_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    timeout_seconds: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEndpointSettings {
    mappings_url: Option<String>,
    bluesky_api: Option<String>,
    webmention_api: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListingSettings {
    mode: Option<String>,
    page_size: Option<u64>,
    initial_load: Option<u64>,
    step: Option<u64>,
    threshold_px: Option<f64>,
    selector: Option<String>,
}

fn positive_seconds(value: Option<u64>, default: u64, key: &'static str) -> Result<u64, LoadError> {
    let value = value.unwrap_or(default);
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "url must use http or https"));
    }
    Ok(url)
}

/// API bases are joined with relative paths, so they must end in `/`.
fn parse_base_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let mut url = parse_http_url(value, key)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
