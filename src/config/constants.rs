//! Configuration constants.
//!
//! This module defines the tuning knobs used throughout the gating pipeline:
//! cache windows, upstream timeouts, tracker capacities, and marker lifetimes.

use std::time::Duration;

// Blocklist cache
/// Freshness window for the cached blocklist snapshot.
/// A newly blocked country may take up to this long to apply on edges that
/// already hold a fresh snapshot; admin mutations invalidate immediately.
pub const BLOCKLIST_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Timeout for a single blocklist store query during a snapshot refresh.
/// Kept short so a slow store degrades to stale/empty instead of delaying
/// the request path.
pub const BLOCKLIST_QUERY_TIMEOUT_MS: u64 = 400;

// Geolocation lookup
/// Timeout for a single geolocation lookup. One attempt per request, no
/// retries; on timeout the decision proceeds without location data.
pub const GEO_LOOKUP_TIMEOUT_MS: u64 = 400;
/// Default geolocation endpoint (ip-api.com JSON API, one path segment per
/// address). Override with `--geo-endpoint` to point at a paid tier or a
/// test double.
pub const DEFAULT_GEO_ENDPOINT: &str = "http://ip-api.com/json";
/// Response fields requested from the geolocation endpoint. `proxy` and
/// `hosting` feed the VPN heuristic alongside the org/ISP strings.
pub const GEO_RESPONSE_FIELDS: &str =
    "status,message,country,countryCode,regionName,city,timezone,isp,org,proxy,hosting";

// Visitor tracking
/// Maximum number of client identifiers remembered for deduplication.
/// Oldest-inserted entries are evicted once the set is full.
pub const VISITOR_SET_CAPACITY: usize = 1000;
/// Depth of the notification dispatch queue. Tracking is best-effort: when
/// the queue is full, events are dropped with a warning rather than making
/// the request path wait.
pub const NOTIFICATION_QUEUE_DEPTH: usize = 256;
/// Length of generated client identifiers.
pub const CLIENT_ID_LEN: usize = 24;

// Client-side marker lifetimes. The host web layer persists these markers
// (cookies or equivalent); the core only prescribes their lifetimes.
/// Lifetime of the "visited home" marker.
pub const VISITED_HOME_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Lifetime of the per-client identifier used for tracking deduplication.
pub const CLIENT_ID_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

// Paths
/// The home path. Serving it sets the "visited home" marker, and it is the
/// default tracked surface.
pub const HOME_PATH: &str = "/";
/// Where blocked visitors are redirected.
pub const BLOCKED_PAGE_PATH: &str = "/blocked";
/// Path prefixes exempt from the home-page gate: API and admin calls,
/// framework internals, and uploaded assets never bounce to home.
pub const GATE_EXEMPT_PREFIXES: &[&str] = &["/api", "/admin", "/_next", "/uploads"];

// Server defaults
/// Default SQLite database path for the blocklist store.
pub const DB_PATH: &str = "./geogate.db";
/// Default port for the admin/status HTTP server.
pub const DEFAULT_LISTEN_PORT: u16 = 8787;
/// Default bind address for the admin/status HTTP server. The admin surface
/// carries no authentication, so it stays on loopback unless overridden.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

// Outbound HTTP
/// Overall timeout for outbound HTTP calls (webhook dispatch). The geo
/// lookup applies its own tighter per-call timeout.
pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 10;
/// User-Agent sent on outbound geo lookups and webhook posts.
pub const DEFAULT_USER_AGENT: &str = concat!("geogate/", env!("CARGO_PKG_VERSION"));
