use std::{path::Path, process, sync::Arc};

use marginalia::{
    application::{
        engagement::EngagementService,
        error::AppError,
        history::InMemoryHistory,
        listing::{Cursor, ListFilter, ListView, PagingMode, ViewState},
        parse::parse_post_list,
    },
    cache::CacheScopes,
    config,
    domain::engagement::{EngagementCounts, EngagementSummary, MentionSummary},
    infra::{
        error::InfraError,
        social::{HttpSocialSource, SocialEndpoints},
        telemetry,
    },
    presentation::views::{PostListView, render_post_list},
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use url::Url;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::List(args) => run_list(&settings, args).await,
        config::Command::Engagement(args) => run_engagement(&settings, args).await,
        config::Command::Mentions(args) => run_mentions(&settings, args).await,
    }
}

async fn run_list(settings: &config::Settings, args: config::ListArgs) -> Result<(), AppError> {
    let html = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(InfraError::from)?;
    let records = parse_post_list(&html, &settings.listing.selectors, OffsetDateTime::now_utc())?
        .ok_or_else(|| AppError::NoList(args.file.display().to_string()))?;

    let mode = settings.listing.mode;
    let base = file_url(&args.file)?;
    let requested = ViewState {
        filter: ListFilter::new(args.search.as_deref().unwrap_or_default(), args.year),
        cursor: match mode {
            PagingMode::Paged { .. } => Cursor::Page(args.page.unwrap_or(1)),
            PagingMode::Incremental { initial, .. } => {
                Cursor::Shown(args.shown.unwrap_or(initial.get()))
            }
        },
    };
    let entry = requested.to_url(&base, &mode);

    let view = ListView::new(
        records,
        mode,
        InMemoryHistory::new(entry),
        settings.listing.threshold_px,
    );
    let rendered = view.render();

    info!(
        target = "marginalia::list",
        file = %args.file.display(),
        records = view.records().len(),
        matches = view.matched_count(),
        cursor = ?view.state().cursor,
        "post list rendered"
    );

    let context = PostListView::build(&rendered, view.state(), &mode, &base, &view.year_counts());
    let output = render_post_list(context).map_err(|err| {
        AppError::unexpected(format!("{}: {err}", err.origin()))
    })?;
    println!("{output}");
    Ok(())
}

#[derive(Serialize)]
struct EngagementReport<'a> {
    post: &'a str,
    combined: EngagementCounts,
    #[serde(flatten)]
    platforms: &'a EngagementSummary,
}

async fn run_engagement(
    settings: &config::Settings,
    args: config::EngagementArgs,
) -> Result<(), AppError> {
    if settings.endpoints.mappings_url.is_none() {
        return Err(AppError::validation(
            "endpoints.mappings_url is required for the engagement command",
        ));
    }

    let service = engagement_service(settings)?;
    let summary = service.summary(&args.url).await;

    info!(
        target = "marginalia::engagement",
        post = %args.url,
        total = summary.combined().total(),
        "engagement fetched"
    );

    print_json(&EngagementReport {
        post: &args.url,
        combined: summary.combined(),
        platforms: &summary,
    })
}

#[derive(Serialize)]
struct MentionsReport<'a> {
    target: &'a str,
    total: usize,
    #[serde(flatten)]
    mentions: &'a MentionSummary,
}

async fn run_mentions(
    settings: &config::Settings,
    args: config::MentionsArgs,
) -> Result<(), AppError> {
    let service = engagement_service(settings)?;
    let mentions = service.mentions(&args.url).await;

    print_json(&MentionsReport {
        target: &args.url,
        total: mentions.len(),
        mentions: &mentions,
    })
}

fn engagement_service(settings: &config::Settings) -> Result<EngagementService, AppError> {
    let source = HttpSocialSource::new(
        SocialEndpoints {
            mappings_url: settings.endpoints.mappings_url.clone(),
            bluesky_api: settings.endpoints.bluesky_api.clone(),
            webmention_api: settings.endpoints.webmention_api.clone(),
        },
        settings.http.timeout,
        &settings.http.user_agent,
    )?;
    let scopes = CacheScopes::open(&settings.cache);

    Ok(EngagementService::new(
        Arc::new(source),
        &scopes,
        &settings.cache,
        settings.http.timeout,
    ))
}

fn file_url(path: &Path) -> Result<Url, AppError> {
    let absolute = std::path::absolute(path).map_err(InfraError::from)?;
    Url::from_file_path(&absolute)
        .map_err(|()| AppError::validation(format!("cannot address `{}`", absolute.display())))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}
