//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "spacetravelling";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_REPOSITORY: &str = "spacetravelling";
const DEFAULT_DOCUMENT_TYPE: &str = "posts";
const DEFAULT_PAGE_SIZE: u32 = 5;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PAGE_CACHE_CAPACITY: usize = 64;
const DEFAULT_SITE_TITLE: &str = "spacetravelling";
const DEFAULT_SITE_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_COMMENTS_REPO: &str = "thiagosawada/05-criando-projeto-do-zero-react";
const DEFAULT_COMMENTS_ISSUE_TERM: &str = "pathname";
const DEFAULT_COMMENTS_LABEL: &str = "comment :speech_balloon:";
const DEFAULT_COMMENTS_THEME: &str = "photon-dark";

/// Command-line arguments for the spacetravelling binary.
#[derive(Debug, Parser)]
#[command(name = "spacetravelling", version, about = "spacetravelling blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SPACETRAVELLING_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the spacetravelling HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the content API base URL.
    #[arg(long = "content-api-url", value_name = "URL")]
    pub content_api_url: Option<String>,

    /// Override the content repository name.
    #[arg(long = "content-repository", value_name = "NAME")]
    pub content_repository: Option<String>,

    /// Override the content API access token.
    #[arg(long = "content-access-token", value_name = "TOKEN")]
    pub content_access_token: Option<String>,

    /// Override the feed page size.
    #[arg(long = "content-page-size", value_name = "COUNT")]
    pub content_page_size: Option<u32>,

    /// Override the materialized-page cache capacity.
    #[arg(long = "cache-page-capacity", value_name = "COUNT")]
    pub cache_page_capacity: Option<usize>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub comments: CommentsSettings,
    pub site: SiteSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
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
pub struct ContentSettings {
    /// Base URL of the content repository; required to serve.
    pub api_url: Option<String>,
    /// Repository name, keying the content source's preview cookie.
    pub repository: String,
    pub document_type: String,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentsSettings {
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub page_capacity: NonZeroUsize,
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

/// Parse CLI arguments and resolve settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SPACETRAVELLING").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    comments: RawCommentsSettings,
    site: RawSiteSettings,
    cache: RawCacheSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    api_url: Option<String>,
    repository: Option<String>,
    document_type: Option<String>,
    page_size: Option<u32>,
    request_timeout_seconds: Option<u64>,
    access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCommentsSettings {
    repo: Option<String>,
    issue_term: Option<String>,
    label: Option<String>,
    theme: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    page_capacity: Option<usize>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.content_api_url.as_ref() {
            self.content.api_url = Some(url.clone());
        }
        if let Some(repository) = overrides.content_repository.as_ref() {
            self.content.repository = Some(repository.clone());
        }
        if let Some(token) = overrides.content_access_token.as_ref() {
            self.content.access_token = Some(token.clone());
        }
        if let Some(size) = overrides.content_page_size {
            self.content.page_size = Some(size);
        }
        if let Some(capacity) = overrides.cache_page_capacity {
            self.cache.page_capacity = Some(capacity);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            comments,
            site,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let comments = build_comments_settings(comments);
        let site = build_site_settings(site);
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            content,
            comments,
            site,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;

    Ok(ServerSettings { public_addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let api_url = content.api_url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let repository = content
        .repository
        .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
    if repository.trim().is_empty() {
        return Err(LoadError::invalid(
            "content.repository",
            "repository name must not be empty",
        ));
    }

    let document_type = content
        .document_type
        .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string());
    if !document_type
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        || document_type.is_empty()
    {
        return Err(LoadError::invalid(
            "content.document_type",
            "document type must be a plain identifier",
        ));
    }

    let page_size = content.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(LoadError::invalid(
            "content.page_size",
            format!("page size must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }

    let timeout_secs = content
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSettings {
        api_url,
        repository,
        document_type,
        page_size,
        request_timeout: Duration::from_secs(timeout_secs),
        access_token: content.access_token,
    })
}

fn build_comments_settings(comments: RawCommentsSettings) -> CommentsSettings {
    CommentsSettings {
        repo: comments
            .repo
            .unwrap_or_else(|| DEFAULT_COMMENTS_REPO.to_string()),
        issue_term: comments
            .issue_term
            .unwrap_or_else(|| DEFAULT_COMMENTS_ISSUE_TERM.to_string()),
        label: comments
            .label
            .unwrap_or_else(|| DEFAULT_COMMENTS_LABEL.to_string()),
        theme: comments
            .theme
            .unwrap_or_else(|| DEFAULT_COMMENTS_THEME.to_string()),
    }
}

fn build_site_settings(site: RawSiteSettings) -> SiteSettings {
    SiteSettings {
        title: site.title.unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        base_url: site
            .base_url
            .unwrap_or_else(|| DEFAULT_SITE_BASE_URL.to_string()),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = cache.page_capacity.unwrap_or(DEFAULT_PAGE_CACHE_CAPACITY);
    let page_capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
        LoadError::invalid("cache.page_capacity", "capacity must be greater than zero")
    })?;
    Ok(CacheSettings { page_capacity })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("failed to parse socket address: {err}"))
}

#[cfg(test)]
mod tests;
