//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::TtlPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STALE_THRESHOLD: f64 = 0.75;
const DEFAULT_TTL_SHORT_SECS: u64 = 30 * 60;
const DEFAULT_TTL_MEDIUM_SECS: u64 = 60 * 60;
const DEFAULT_TTL_LONG_SECS: u64 = 3 * 60 * 60;
const DEFAULT_TTL_LONGEST_SECS: u64 = 6 * 60 * 60;
const DEFAULT_CAP_NEW_SECS: u64 = 30 * 60;
const DEFAULT_CAP_ON_SALE_SECS: u64 = 20 * 60;
const DEFAULT_CAP_LIMITED_STOCK_SECS: u64 = 15 * 60;
const DEFAULT_POPULARITY_RETENTION_DAYS: u64 = 45;
const DEFAULT_INDEX_BACKUP_TTL_SECS: u64 = 15 * 60;
const DEFAULT_SEARCH_RESULT_TTL_SECS: u64 = 5 * 60;
const DEFAULT_SEARCH_DEFAULT_LIMIT: u32 = 20;
const DEFAULT_SEARCH_MAX_LIMIT: u32 = 100;
const DEFAULT_REFRESH_INDEX_CRON: &str = "0 */10 * * * *";
const DEFAULT_WARM_CACHE_CRON: &str = "0 */15 * * * *";
const DEFAULT_CLEANUP_CRON: &str = "0 0 * * * *";
const DEFAULT_WARM_TOP_N: u32 = 20;

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser)]
#[command(name = "vetrina", version, about = "Vetrina storefront edge cache")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Vetrina HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the bind host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the bind port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown window in seconds.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long = "log-json", value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub log_json: Option<bool>,

    /// Override the API bearer token protecting the mutating endpoints.
    #[arg(long = "auth-api-token", value_name = "TOKEN")]
    pub auth_api_token: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub auth: AuthSettings,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub jobs: JobsSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct AuthSettings {
    /// Bearer token required by the mutating endpoints. When unset, those
    /// endpoints are open; only suitable for local development.
    pub api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub stale_threshold: f64,
    pub ttl: TtlPolicy,
    pub popularity_retention: Duration,
    pub index_backup_ttl: Duration,
    pub search_result_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub default_limit: NonZeroU32,
    pub max_limit: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct JobsSettings {
    pub refresh_index_cron: String,
    pub warm_cache_cron: String,
    pub cleanup_cron: String,
    pub warm_top_n: NonZeroU32,
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

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    auth: RawAuthSettings,
    cache: RawCacheSettings,
    search: RawSearchSettings,
    jobs: RawJobsSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    stale_threshold: Option<f64>,
    ttl_short_seconds: Option<u64>,
    ttl_medium_seconds: Option<u64>,
    ttl_long_seconds: Option<u64>,
    ttl_longest_seconds: Option<u64>,
    cap_new_seconds: Option<u64>,
    cap_on_sale_seconds: Option<u64>,
    cap_limited_stock_seconds: Option<u64>,
    popularity_retention_days: Option<u64>,
    index_backup_ttl_seconds: Option<u64>,
    search_result_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    default_limit: Option<u32>,
    max_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawJobsSettings {
    refresh_index_cron: Option<String>,
    warm_cache_cron: Option<String>,
    cleanup_cron: Option<String>,
    warm_top_n: Option<u32>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(token) = overrides.auth_api_token.as_ref() {
            self.auth.api_token = Some(token.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            auth,
            cache,
            search,
            jobs,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            auth: build_auth_settings(auth),
            cache: build_cache_settings(cache)?,
            search: build_search_settings(search)?,
            jobs: build_jobs_settings(jobs)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_auth_settings(auth: RawAuthSettings) -> AuthSettings {
    let api_token = auth.api_token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    AuthSettings { api_token }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let stale_threshold = cache.stale_threshold.unwrap_or(DEFAULT_STALE_THRESHOLD);
    if stale_threshold <= 0.0 || stale_threshold >= 1.0 {
        return Err(LoadError::invalid(
            "cache.stale_threshold",
            "must lie strictly between 0 and 1",
        ));
    }

    let short = cache.ttl_short_seconds.unwrap_or(DEFAULT_TTL_SHORT_SECS);
    let medium = cache.ttl_medium_seconds.unwrap_or(DEFAULT_TTL_MEDIUM_SECS);
    let long = cache.ttl_long_seconds.unwrap_or(DEFAULT_TTL_LONG_SECS);
    let longest = cache.ttl_longest_seconds.unwrap_or(DEFAULT_TTL_LONGEST_SECS);
    for (key, value) in [
        ("cache.ttl_short_seconds", short),
        ("cache.ttl_medium_seconds", medium),
        ("cache.ttl_long_seconds", long),
        ("cache.ttl_longest_seconds", longest),
    ] {
        if value == 0 {
            return Err(LoadError::invalid(key, "must be greater than zero"));
        }
    }
    if !(short <= medium && medium <= long && long <= longest) {
        return Err(LoadError::invalid(
            "cache.ttl_short_seconds",
            "TTL buckets must be ordered short <= medium <= long <= longest",
        ));
    }

    let ttl = TtlPolicy {
        short: Duration::from_secs(short),
        medium: Duration::from_secs(medium),
        long: Duration::from_secs(long),
        longest: Duration::from_secs(longest),
        cap_new: Duration::from_secs(cache.cap_new_seconds.unwrap_or(DEFAULT_CAP_NEW_SECS)),
        cap_on_sale: Duration::from_secs(
            cache.cap_on_sale_seconds.unwrap_or(DEFAULT_CAP_ON_SALE_SECS),
        ),
        cap_limited_stock: Duration::from_secs(
            cache
                .cap_limited_stock_seconds
                .unwrap_or(DEFAULT_CAP_LIMITED_STOCK_SECS),
        ),
    };

    let retention_days = cache
        .popularity_retention_days
        .unwrap_or(DEFAULT_POPULARITY_RETENTION_DAYS);
    if retention_days == 0 {
        return Err(LoadError::invalid(
            "cache.popularity_retention_days",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        stale_threshold,
        ttl,
        popularity_retention: Duration::from_secs(retention_days * 24 * 3600),
        index_backup_ttl: Duration::from_secs(
            cache
                .index_backup_ttl_seconds
                .unwrap_or(DEFAULT_INDEX_BACKUP_TTL_SECS),
        ),
        search_result_ttl: Duration::from_secs(
            cache
                .search_result_ttl_seconds
                .unwrap_or(DEFAULT_SEARCH_RESULT_TTL_SECS),
        ),
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let default_limit = non_zero_u32(
        search.default_limit.unwrap_or(DEFAULT_SEARCH_DEFAULT_LIMIT),
        "search.default_limit",
    )?;
    let max_limit = non_zero_u32(
        search.max_limit.unwrap_or(DEFAULT_SEARCH_MAX_LIMIT),
        "search.max_limit",
    )?;
    if default_limit > max_limit {
        return Err(LoadError::invalid(
            "search.default_limit",
            "must not exceed search.max_limit",
        ));
    }
    Ok(SearchSettings {
        default_limit,
        max_limit,
    })
}

fn build_jobs_settings(jobs: RawJobsSettings) -> Result<JobsSettings, LoadError> {
    let refresh_index_cron = jobs
        .refresh_index_cron
        .unwrap_or_else(|| DEFAULT_REFRESH_INDEX_CRON.to_string());
    let warm_cache_cron = jobs
        .warm_cache_cron
        .unwrap_or_else(|| DEFAULT_WARM_CACHE_CRON.to_string());
    let cleanup_cron = jobs
        .cleanup_cron
        .unwrap_or_else(|| DEFAULT_CLEANUP_CRON.to_string());

    for (key, expression) in [
        ("jobs.refresh_index_cron", refresh_index_cron.as_str()),
        ("jobs.warm_cache_cron", warm_cache_cron.as_str()),
        ("jobs.cleanup_cron", cleanup_cron.as_str()),
    ] {
        apalis_cron::Schedule::from_str(expression)
            .map_err(|err| LoadError::invalid(key, format!("failed to parse: {err}")))?;
    }

    Ok(JobsSettings {
        refresh_index_cron,
        warm_cache_cron,
        cleanup_cron,
        warm_top_n: non_zero_u32(jobs.warm_top_n.unwrap_or(DEFAULT_WARM_TOP_N), "jobs.warm_top_n")?,
    })
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("failed to parse `{host}:{port}`: {err}"))
}
