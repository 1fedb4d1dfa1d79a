//! Error categorization.
//!
//! This module maps transport-level failures onto the counter types used by
//! `GateStats`, so the status surface can say why lookups are failing.

use super::stats::GateStats;
use super::types::ErrorType;

/// Categorizes a `reqwest::Error` from a geolocation lookup into an
/// `ErrorType`.
///
/// # Arguments
///
/// * `error` - The `reqwest::Error` to categorize
///
/// # Returns
///
/// The appropriate `ErrorType` for the error.
pub fn categorize_geo_error(error: &reqwest::Error) -> ErrorType {
    if error.is_timeout() {
        ErrorType::GeoLookupTimeout
    } else if error.is_connect() {
        ErrorType::GeoLookupConnectError
    } else if error.is_status() {
        ErrorType::GeoLookupStatusError
    } else if error.is_decode() {
        ErrorType::GeoLookupDecodeError
    } else {
        ErrorType::GeoLookupRequestError
    }
}

/// Records a geolocation lookup failure in the statistics tracker.
///
/// # Arguments
///
/// * `stats` - The gate statistics tracker to update
/// * `error` - The `reqwest::Error` to categorize and record
pub fn record_geo_error(stats: &GateStats, error: &reqwest::Error) {
    let error_type = categorize_geo_error(error);
    stats.increment_error(error_type);
}

#[cfg(test)]
mod tests {
    use super::*;

    // reqwest::Error instances can only be produced by actual requests, so
    // the categorization branches are exercised end to end by the resolver
    // integration tests (wiremock endpoint returning error status, refused
    // connections, and undecodable bodies). Here we only pin the fallback.

    #[tokio::test]
    async fn test_connect_error_categorized() {
        // Port 1 on localhost is essentially guaranteed to refuse connections
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:1/json/1.2.3.4")
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .expect_err("request to a closed port should fail");

        let categorized = categorize_geo_error(&err);
        assert!(
            categorized == ErrorType::GeoLookupConnectError
                || categorized == ErrorType::GeoLookupTimeout,
            "expected connect or timeout categorization, got {:?}",
            categorized
        );
    }
}
