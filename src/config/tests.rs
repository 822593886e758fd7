use super::*;

fn list_args(extra: &[&str]) -> CliArgs {
    let mut argv = vec!["marginalia", "list", "index.html"];
    argv.extend_from_slice(extra);
    CliArgs::parse_from(argv)
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.cache.counts_ttl_seconds, 300);
    assert_eq!(settings.cache.identity_ttl_seconds, 86_400);
    assert_eq!(settings.http.timeout, Duration::from_secs(5));
    assert!(settings.http.user_agent.starts_with("marginalia/"));
    assert!(settings.endpoints.mappings_url.is_none());
    assert_eq!(
        settings.endpoints.bluesky_api.as_str(),
        "https://public.api.bsky.app/"
    );
    assert_eq!(
        settings.listing.mode,
        PagingMode::Paged {
            page_size: NonZeroUsize::new(20).expect("non-zero"),
        }
    );
    assert_eq!(settings.listing.selectors.container(), "ul.blog-posts");
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.http.timeout_seconds = Some(30);

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        http_timeout_seconds: Some(2),
        ..Default::default()
    };

    raw.apply_global_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.http.timeout, Duration::from_secs(2));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_global_overrides(&GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.counts_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.counts_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn incremental_mode_uses_initial_and_step() {
    let mut raw = RawSettings::default();
    raw.listing.mode = Some("incremental".to_string());
    raw.listing.initial_load = Some(15);
    raw.listing.step = Some(5);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.listing.mode,
        PagingMode::Incremental {
            initial: NonZeroUsize::new(15).expect("non-zero"),
            step: NonZeroUsize::new(5).expect("non-zero"),
        }
    );
}

#[test]
fn unknown_mode_and_bad_selector_are_rejected() {
    let mut raw = RawSettings::default();
    raw.listing.mode = Some("endless".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.listing.selector = Some("ul[".to_string());
    let err = Settings::from_raw(raw).expect_err("bad selector");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "listing.selector",
            ..
        }
    ));
}

#[test]
fn api_bases_gain_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.endpoints.webmention_api = Some("https://mentions.example/v2".to_string());
    raw.endpoints.mappings_url = Some("ftp://nope/mappings.json".to_string());
    assert!(Settings::from_raw(raw.clone()).is_err());

    raw.endpoints.mappings_url = Some("https://blog.example/mappings.json".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.endpoints.webmention_api.as_str(),
        "https://mentions.example/v2/"
    );
}

#[test]
fn parse_list_arguments() {
    let args = list_args(&["--search", "rust", "--year", "2024", "--page", "3"]);

    match args.command {
        Command::List(list) => {
            assert_eq!(list.file, std::path::Path::new("index.html"));
            assert_eq!(list.search.as_deref(), Some("rust"));
            assert_eq!(list.year, Some(2024));
            assert_eq!(list.page, Some(3));
            assert!(!list.incremental);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn shown_switches_listing_to_incremental() {
    let args = list_args(&["--shown", "40"]);
    let mut raw = RawSettings::default();
    match &args.command {
        Command::List(list) => raw.apply_list_overrides(list),
        _ => panic!("wrong command parsed"),
    }

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(
        settings.listing.mode,
        PagingMode::Incremental { .. }
    ));
}

#[test]
fn page_and_shown_conflict() {
    let result = CliArgs::try_parse_from([
        "marginalia",
        "list",
        "x.html",
        "--page",
        "2",
        "--shown",
        "9",
    ]);
    assert!(result.is_err());
}

#[test]
fn parse_engagement_arguments() {
    let args = CliArgs::parse_from([
        "marginalia",
        "--log-level",
        "debug",
        "engagement",
        "https://blog.example/spring/",
        "--mappings-url",
        "https://blog.example/mappings.json",
    ]);

    assert_eq!(args.overrides.log_level.as_deref(), Some("debug"));
    match args.command {
        Command::Engagement(engagement) => {
            assert_eq!(engagement.url, "https://blog.example/spring/");
            assert_eq!(
                engagement.mappings_url.as_deref(),
                Some("https://blog.example/mappings.json")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
