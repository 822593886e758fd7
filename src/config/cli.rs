use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the marginalia binary.
#[derive(Debug, Parser)]
#[command(
    name = "marginalia",
    version,
    about = "Blog list enhancement and social engagement toolkit"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MARGINALIA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Filter, paginate and render the post list found in an HTML page.
    List(ListArgs),
    /// Print combined Mastodon and Bluesky engagement for a blog post as JSON.
    Engagement(EngagementArgs),
    /// Print webmentions received by a URL as JSON.
    Mentions(MentionsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the persistent cache directory.
    #[arg(long = "cache-directory", value_name = "PATH", global = true)]
    pub cache_directory: Option<PathBuf>,

    /// Override the per-request HTTP timeout.
    #[arg(long = "http-timeout-seconds", value_name = "SECONDS", global = true)]
    pub http_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// HTML page containing the server-rendered post list.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Case-insensitive text filter.
    #[arg(long)]
    pub search: Option<String>,

    /// Only show posts from this year.
    #[arg(long)]
    pub year: Option<i32>,

    /// Page to show in paged mode.
    #[arg(long, conflicts_with = "shown")]
    pub page: Option<usize>,

    /// Number of posts revealed in incremental mode.
    #[arg(long)]
    pub shown: Option<usize>,

    /// Use incremental ("load more") paging instead of fixed pages.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub incremental: bool,

    /// Override the list container selector.
    #[arg(long = "selector", value_name = "CSS")]
    pub selector: Option<String>,

    /// Override the page size.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct EngagementArgs {
    /// Blog post URL or path as listed in the mappings file.
    #[arg(value_name = "URL")]
    pub url: String,

    /// Override the mappings file URL.
    #[arg(long = "mappings-url", value_name = "URL")]
    pub mappings_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct MentionsArgs {
    /// Target URL whose webmentions should be listed.
    #[arg(value_name = "URL")]
    pub url: String,
}
