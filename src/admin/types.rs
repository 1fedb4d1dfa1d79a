//! Admin server data structures.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::blocklist::BlocklistCache;
use crate::error_handling::GateStats;
use crate::gate::{AccessGate, DecisionReason, HomeGate, Verdict};
use crate::geo::LocationRecord;
use crate::storage::{format_expiration, BlockDuration, BlockedCountry};
use crate::tracker::VisitorTracker;

/// Shared state for the admin server
#[derive(Clone)]
pub struct AdminState {
    /// Blocklist cache handling reads and admin mutations.
    pub blocklist: Arc<BlocklistCache>,
    /// The decision engine behind `/decide`.
    pub gate: Arc<AccessGate>,
    /// Home-page-first gate, evaluated alongside the country gate.
    pub home_gate: Arc<HomeGate>,
    /// Visit tracker fed by `/decide`.
    pub tracker: Arc<VisitorTracker>,
    /// Shared counters surfaced by `/status`.
    pub stats: Arc<GateStats>,
    /// Server start time, for the uptime readout.
    pub start_time: Arc<Instant>,
}

/// One blocklist entry as the admin UI consumes it: the stored row plus a
/// human-readable remaining time and an activity flag.
///
/// camelCase on the wire; this surface predates the service and its
/// consumers expect the original field names.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedCountryView {
    pub id: i64,
    pub country_code: String,
    pub country_name: String,
    pub expires_at: Option<i64>,
    pub expires_in: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BlockedCountryView {
    /// Projects a storage row at a given instant.
    pub fn from_entry(entry: BlockedCountry, now_ms: i64) -> Self {
        BlockedCountryView {
            expires_in: format_expiration(entry.expires_at, now_ms),
            is_active: entry.is_active(now_ms),
            id: entry.id,
            country_code: entry.country_code,
            country_name: entry.country_name,
            expires_at: entry.expires_at,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// One selectable country for the admin picker.
#[derive(Debug, Serialize)]
pub struct CountryOption {
    pub code: &'static str,
    pub name: &'static str,
}

/// `GET /admin/blocked-countries` response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlockedResponse {
    pub blocked_countries: Vec<BlockedCountryView>,
    pub all_countries: Vec<CountryOption>,
}

/// `POST /admin/blocked-countries` body: the full desired blocked set.
#[derive(Debug, Deserialize)]
pub struct SetBlockedRequest {
    pub country_codes: Vec<String>,
    /// Omitted means permanent.
    #[serde(default)]
    pub duration: Option<BlockDuration>,
}

/// `POST /admin/blocked-countries` response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBlockedResponse {
    pub message: String,
    pub blocked_countries: Vec<BlockedCountryView>,
}

/// `PATCH /admin/blocked-countries` body.
#[derive(Debug, Deserialize)]
pub struct UpdateExpirationRequest {
    pub country_code: String,
    pub duration: BlockDuration,
}

/// `PATCH /admin/blocked-countries` response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpirationResponse {
    pub message: String,
    pub country: BlockedCountryView,
}

/// `DELETE /admin/blocked-countries` query string.
#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub country_code: Option<String>,
}

/// Simple acknowledgement body.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body for 4xx/5xx answers.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `POST /decide` body: one request as seen at the edge.
#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub path: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub country_hint: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub visited_home: bool,
}

/// `POST /decide` response: the verdict plus everything the edge needs to
/// act on it (redirect target, client-side state to set).
#[derive(Serialize)]
pub struct DecideResponse {
    pub verdict: Verdict,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationRecord>,
    /// Where to send the client instead of serving the request, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// The client identifier to persist on the client.
    pub client_id: String,
    /// True when `client_id` was freshly generated and must be stored.
    pub set_client_id: bool,
    /// True when the visited-home marker should be (re)set.
    pub set_visited_marker: bool,
    /// Whether this request fired a visit notification.
    pub tracked: bool,
}

/// JSON response for `/status` endpoint
#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: f64,
    pub decisions: DecisionCounts,
    pub blocklist: BlocklistStatus,
    pub tracker: TrackerStatus,
    pub errors: ErrorCounts,
    pub warnings: WarningCounts,
    pub info: InfoCounts,
}

#[derive(Serialize)]
pub struct DecisionCounts {
    pub allowed: usize,
    pub redirected: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct BlocklistStatus {
    pub active_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_age_seconds: Option<u64>,
}

#[derive(Serialize)]
pub struct TrackerStatus {
    pub tracked_clients: usize,
}

#[derive(Serialize)]
pub struct ErrorCounts {
    pub total: usize,
    pub geo_timeout: usize,
    pub geo_connect_error: usize,
    pub geo_status_error: usize,
    pub geo_request_error: usize,
    pub geo_decode_error: usize,
    pub blocklist_query_timeout: usize,
    pub blocklist_query_error: usize,
    pub notification_dispatch_error: usize,
    pub notification_queue_full: usize,
}

#[derive(Serialize)]
pub struct WarningCounts {
    pub total: usize,
    pub blocklist_served_stale: usize,
    pub blocklist_fail_open_empty: usize,
    pub geo_no_data: usize,
    pub missing_client_id: usize,
}

#[derive(Serialize)]
pub struct InfoCounts {
    pub total: usize,
    pub infra_exempted: usize,
    pub vpn_bypass_allowed: usize,
    pub edge_hint_preferred: usize,
    pub blocklist_cache_hit: usize,
    pub blocklist_refreshed: usize,
    pub duplicate_visitor_suppressed: usize,
    pub visit_notification_sent: usize,
}
