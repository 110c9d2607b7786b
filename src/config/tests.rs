use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.content.repository, DEFAULT_REPOSITORY);
    assert_eq!(settings.content.document_type, DEFAULT_DOCUMENT_TYPE);
    assert_eq!(settings.content.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(settings.content.api_url, None);
    assert_eq!(settings.cache.page_capacity.get(), DEFAULT_PAGE_CACHE_CAPACITY);
    assert_eq!(settings.site.title, DEFAULT_SITE_TITLE);
    assert_eq!(settings.comments.issue_term, "pathname");
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.content.page_size = Some(3);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        content_page_size: Some(9),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.content.page_size, 9);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_port_is_rejected_with_its_key() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port rejected");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn page_size_bounds_are_enforced() {
    let mut raw = RawSettings::default();
    raw.content.page_size = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.content.page_size = Some(MAX_PAGE_SIZE + 1);
    let err = Settings::from_raw(raw).expect_err("oversized page rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "content.page_size",
            ..
        }
    ));
}

#[test]
fn blank_api_url_reads_as_unconfigured() {
    let mut raw = RawSettings::default();
    raw.content.api_url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.content.api_url, None);
}

#[test]
fn document_type_must_be_a_plain_identifier() {
    let mut raw = RawSettings::default();
    raw.content.document_type = Some("posts\"]]".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.page_capacity = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero capacity rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.page_capacity",
            ..
        }
    ));
}
