//! The decision endpoint the edge layer calls per request.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::config::BLOCKED_PAGE_PATH;
use crate::error_handling::WarningType;
use crate::gate::{HomeVerdict, Verdict};
use crate::request::{client_addr_from_headers, generate_client_id, RequestContext};
use crate::tracker::VisitEvent;

use super::super::types::{AdminState, DecideRequest, DecideResponse};

/// Runs the full gating pipeline for one request description.
///
/// The country gate's redirect wins over the home gate's: a blocked visitor
/// goes to the blocked page even without a visited-home marker. Tracking is
/// fired here (deduplicated, fire-and-forget) when the decision calls for
/// it, so callers get the verdict without waiting on delivery.
pub async fn decide(State(state): State<AdminState>, Json(body): Json<DecideRequest>) -> Response {
    let mut ctx = RequestContext {
        path: body.path,
        origin: body.origin,
        country_hint: body.country_hint,
        user_agent: body.user_agent,
        headers: body.headers,
        client_id: body.client_id,
        visited_home: body.visited_home,
    };
    if ctx.origin.is_none() {
        ctx.origin = client_addr_from_headers(&ctx.headers);
    }

    let decision = state.gate.decide(&ctx).await;
    let home = state.home_gate.evaluate(&ctx.path, ctx.visited_home);

    let redirect_to = match decision.verdict {
        Verdict::RedirectBlocked => Some(BLOCKED_PAGE_PATH.to_string()),
        Verdict::Allow => match home {
            HomeVerdict::RedirectToHome => Some(state.home_gate.home_path().to_string()),
            HomeVerdict::Pass | HomeVerdict::PassAndSetMarker => None,
        },
    };
    let set_visited_marker =
        decision.verdict == Verdict::Allow && home == HomeVerdict::PassAndSetMarker;

    let (client_id, set_client_id) = match ctx.client_id.clone() {
        Some(id) => (id, false),
        None => {
            if decision.should_track {
                state.stats.increment_warning(WarningType::MissingClientId);
            }
            (generate_client_id(), true)
        }
    };

    let tracked = if decision.should_track {
        let event = VisitEvent::from_decision(&ctx, &decision);
        state.tracker.track_if_new(&client_id, event)
    } else {
        false
    };

    Json(DecideResponse {
        verdict: decision.verdict,
        reason: decision.reason,
        country: decision.country,
        location: decision.location,
        redirect_to,
        client_id,
        set_client_id,
        set_visited_marker,
        tracked,
    })
    .into_response()
}
