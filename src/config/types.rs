//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument
//! parsing and configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    BLOCKLIST_QUERY_TIMEOUT_MS, DB_PATH, DEFAULT_BIND_ADDR, DEFAULT_GEO_ENDPOINT,
    DEFAULT_LISTEN_PORT, DEFAULT_USER_AGENT, GEO_LOOKUP_TIMEOUT_MS, HTTP_CLIENT_TIMEOUT_SECS,
    NOTIFICATION_QUEUE_DEPTH, VISITOR_SET_CAPACITY,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which request paths fire visitor tracking.
///
/// The historical deployments disagreed on this, so it is explicit
/// configuration rather than a per-route decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TrackedSurfaceKind {
    /// Track visits to the home page only (default)
    Home,
    /// Track every page except exempt prefixes and asset paths
    All,
    /// Tracking disabled
    Off,
}

/// Service configuration, parsed from the command line.
///
/// Every field has a default so the struct can also be constructed
/// programmatically (library usage, tests) via `Config::default()` plus
/// struct update syntax.
///
/// # Examples
///
/// ```no_run
/// use geogate::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     db_path: PathBuf::from("./gate.db"),
///     webhook_url: Some("https://discord.com/api/webhooks/...".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Parser, Debug, Clone)]
#[command(
    name = "geogate",
    about = "Country gating and visit tracking service for storefront edges"
)]
pub struct Config {
    /// Database path (SQLite file)
    #[arg(long, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Geolocation endpoint (ip-api.com compatible JSON API)
    #[arg(long, default_value = DEFAULT_GEO_ENDPOINT)]
    pub geo_endpoint: String,

    /// Timeout for a single geolocation lookup, in milliseconds
    #[arg(long, default_value_t = GEO_LOOKUP_TIMEOUT_MS)]
    pub geo_timeout_ms: u64,

    /// Blocklist snapshot freshness window, in seconds
    #[arg(long, default_value_t = 300)]
    pub blocklist_ttl_secs: u64,

    /// Timeout for a blocklist store query during refresh, in milliseconds
    #[arg(long, default_value_t = BLOCKLIST_QUERY_TIMEOUT_MS)]
    pub blocklist_query_timeout_ms: u64,

    /// Webhook URL for visit notifications (disabled when absent)
    #[arg(long, env = "GEOGATE_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Capacity of the visitor deduplication set
    #[arg(long, default_value_t = VISITOR_SET_CAPACITY)]
    pub visitor_capacity: usize,

    /// Depth of the notification dispatch queue
    #[arg(long, default_value_t = NOTIFICATION_QUEUE_DEPTH)]
    pub notification_queue_depth: usize,

    /// Whether VPN/proxy traffic bypasses country blocking
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub vpn_bypass: bool,

    /// Which request paths fire visitor tracking
    #[arg(long, value_enum, default_value = "home")]
    pub tracked_surface: TrackedSurfaceKind,

    /// Bind address for the admin/status HTTP server
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Port for the admin/status HTTP server
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// Overall timeout for outbound HTTP calls, in seconds
    #[arg(long, default_value_t = HTTP_CLIENT_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// HTTP User-Agent header value for outbound calls
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            geo_endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            geo_timeout_ms: GEO_LOOKUP_TIMEOUT_MS,
            blocklist_ttl_secs: 300,
            blocklist_query_timeout_ms: BLOCKLIST_QUERY_TIMEOUT_MS,
            webhook_url: None,
            visitor_capacity: VISITOR_SET_CAPACITY,
            notification_queue_depth: NOTIFICATION_QUEUE_DEPTH,
            vpn_bypass: true,
            tracked_surface: TrackedSurfaceKind::Home,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_LISTEN_PORT,
            http_timeout_secs: HTTP_CLIENT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
