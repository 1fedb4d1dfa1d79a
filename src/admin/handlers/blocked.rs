//! Blocklist CRUD handlers.
//!
//! These keep the storefront admin contract: snake_case request fields,
//! camelCase response payloads, replace-set semantics on POST, and per-entry
//! PATCH/DELETE. Every mutation goes through
//! [`crate::blocklist::BlocklistCache`] so the gate's snapshot is invalidated
//! in the same call.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;

use crate::countries;
use crate::error_handling::BlocklistError;
use crate::storage::{now_millis, BlockDuration};

use super::super::types::{
    AdminState, BlockedCountryView, CountryOption, ErrorResponse, ListBlockedResponse,
    MessageResponse, RemoveQuery, SetBlockedRequest, SetBlockedResponse,
    UpdateExpirationRequest, UpdateExpirationResponse,
};

/// Lists every blocklist entry (expired included) plus the full country
/// directory for the admin picker.
pub async fn list_blocked(State(state): State<AdminState>) -> Response {
    match state.blocklist.list_all().await {
        Ok(entries) => {
            let now = now_millis();
            let blocked_countries = entries
                .into_iter()
                .map(|entry| BlockedCountryView::from_entry(entry, now))
                .collect();
            let all_countries = countries::ALL_COUNTRIES
                .iter()
                .map(|(code, name)| CountryOption { code, name })
                .collect();
            Json(ListBlockedResponse {
                blocked_countries,
                all_countries,
            })
            .into_response()
        }
        Err(e) => blocklist_error_response(e),
    }
}

/// Replaces the blocked set with the submitted codes.
pub async fn set_blocked(
    State(state): State<AdminState>,
    Json(body): Json<SetBlockedRequest>,
) -> Response {
    let duration = body.duration.unwrap_or(BlockDuration::Permanent);
    match state.blocklist.set_blocked(&body.country_codes, duration).await {
        Ok(entries) => {
            let now = now_millis();
            Json(SetBlockedResponse {
                message: "Blocked countries updated".to_string(),
                blocked_countries: entries
                    .into_iter()
                    .map(|entry| BlockedCountryView::from_entry(entry, now))
                    .collect(),
            })
            .into_response()
        }
        Err(e) => blocklist_error_response(e),
    }
}

/// Changes the expiration of one blocked country.
pub async fn update_expiration(
    State(state): State<AdminState>,
    Json(body): Json<UpdateExpirationRequest>,
) -> Response {
    match state
        .blocklist
        .update_expiration(&body.country_code, body.duration)
        .await
    {
        Ok(entry) => Json(UpdateExpirationResponse {
            message: "Expiration updated".to_string(),
            country: BlockedCountryView::from_entry(entry, now_millis()),
        })
        .into_response(),
        Err(e) => blocklist_error_response(e),
    }
}

/// Removes one country from the blocked list, by `?country_code=XX`.
pub async fn remove_blocked(
    State(state): State<AdminState>,
    Query(query): Query<RemoveQuery>,
) -> Response {
    let Some(code) = query.country_code.filter(|code| !code.trim().is_empty()) else {
        return error_body(StatusCode::BAD_REQUEST, "Country code is required");
    };
    match state.blocklist.remove(&code).await {
        Ok(()) => Json(MessageResponse {
            message: "Country removed from blocked list".to_string(),
        })
        .into_response(),
        Err(e) => blocklist_error_response(e),
    }
}

/// Maps a blocklist failure onto the admin API's status codes.
fn blocklist_error_response(err: BlocklistError) -> Response {
    match err {
        BlocklistError::InvalidCountryCode(code) => error_body(
            StatusCode::BAD_REQUEST,
            &format!("Invalid country code: {code}"),
        ),
        BlocklistError::NoValidCodes => {
            error_body(StatusCode::BAD_REQUEST, "No valid country codes provided")
        }
        BlocklistError::NotFound(_) => error_body(
            StatusCode::NOT_FOUND,
            "Country not found in blocked list",
        ),
        BlocklistError::Store(e) => {
            error!("Blocklist store operation failed: {e}");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
