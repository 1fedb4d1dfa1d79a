//! JSON status handler.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error_handling::{ErrorType, InfoType, WarningType};

use super::super::types::{
    AdminState, BlocklistStatus, DecisionCounts, ErrorCounts, InfoCounts, StatusResponse,
    TrackerStatus, WarningCounts,
};

/// JSON status endpoint with decision, cache, and failure counters.
pub async fn status(State(state): State<AdminState>) -> Response {
    let uptime = state.start_time.elapsed().as_secs_f64();

    // Reading through the cache keeps the snapshot warm; a status poll is a
    // legitimate consumer like any other.
    let mut active_codes: Vec<String> =
        state.blocklist.active_codes().await.iter().cloned().collect();
    active_codes.sort();

    let stats = &state.stats;
    let response = StatusResponse {
        uptime_seconds: uptime,
        decisions: DecisionCounts {
            allowed: stats.allowed_count(),
            redirected: stats.redirected_count(),
            total: stats.total_decisions(),
        },
        blocklist: BlocklistStatus {
            active_codes,
            snapshot_age_seconds: state.blocklist.snapshot_age_secs().await,
        },
        tracker: TrackerStatus {
            tracked_clients: state.tracker.tracked_count(),
        },
        errors: ErrorCounts {
            total: stats.total_errors(),
            geo_timeout: stats.get_error_count(ErrorType::GeoLookupTimeout),
            geo_connect_error: stats.get_error_count(ErrorType::GeoLookupConnectError),
            geo_status_error: stats.get_error_count(ErrorType::GeoLookupStatusError),
            geo_request_error: stats.get_error_count(ErrorType::GeoLookupRequestError),
            geo_decode_error: stats.get_error_count(ErrorType::GeoLookupDecodeError),
            blocklist_query_timeout: stats.get_error_count(ErrorType::BlocklistQueryTimeout),
            blocklist_query_error: stats.get_error_count(ErrorType::BlocklistQueryError),
            notification_dispatch_error: stats
                .get_error_count(ErrorType::NotificationDispatchError),
            notification_queue_full: stats.get_error_count(ErrorType::NotificationQueueFull),
        },
        warnings: WarningCounts {
            total: stats.total_warnings(),
            blocklist_served_stale: stats.get_warning_count(WarningType::BlocklistServedStale),
            blocklist_fail_open_empty: stats
                .get_warning_count(WarningType::BlocklistFailOpenEmpty),
            geo_no_data: stats.get_warning_count(WarningType::GeoLookupNoData),
            missing_client_id: stats.get_warning_count(WarningType::MissingClientId),
        },
        info: InfoCounts {
            total: stats.total_info(),
            infra_exempted: stats.get_info_count(InfoType::InfraExempted),
            vpn_bypass_allowed: stats.get_info_count(InfoType::VpnBypassAllowed),
            edge_hint_preferred: stats.get_info_count(InfoType::EdgeHintPreferred),
            blocklist_cache_hit: stats.get_info_count(InfoType::BlocklistCacheHit),
            blocklist_refreshed: stats.get_info_count(InfoType::BlocklistRefreshed),
            duplicate_visitor_suppressed: stats
                .get_info_count(InfoType::DuplicateVisitorSuppressed),
            visit_notification_sent: stats.get_info_count(InfoType::VisitNotificationSent),
        },
    };

    Json(response).into_response()
}
