//! Visitor geolocation via an external lookup service.
//!
//! One lookup per request, no retries, no per-address caching: the tracker
//! wants fresh per-visit data and the gate tolerates absence. Every failure
//! mode degrades to `None`, which the gate reads as "location unknown" and
//! never as a block signal.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::config::GEO_RESPONSE_FIELDS;
use crate::error_handling::{record_geo_error, GateStats, WarningType};
use crate::infra::InfraClassifier;

mod types;

pub use types::LocationRecord;

use types::GeoApiResponse;

/// Resolves visitor addresses to [`LocationRecord`]s.
pub struct GeoResolver {
    client: Arc<reqwest::Client>,
    endpoint: String,
    timeout: Duration,
    classifier: Arc<InfraClassifier>,
    stats: Arc<GateStats>,
}

impl GeoResolver {
    /// Creates a resolver against an ip-api-style endpoint.
    ///
    /// `endpoint` is the base URL without a trailing slash or address, e.g.
    /// `http://ip-api.com/json`. `timeout` bounds the single upstream call;
    /// the request path never waits longer than this for location data.
    pub fn new(
        client: Arc<reqwest::Client>,
        endpoint: impl Into<String>,
        timeout: Duration,
        classifier: Arc<InfraClassifier>,
        stats: Arc<GateStats>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        GeoResolver {
            client,
            endpoint,
            timeout,
            classifier,
            stats,
        }
    }

    /// Looks up the location of `addr`.
    ///
    /// Returns `None` without touching the network for loopback, private,
    /// unparseable, and platform-infrastructure addresses, and for any
    /// upstream failure (timeout, transport error, non-success status,
    /// undecodable body, or an explicit "fail" answer).
    pub async fn resolve(&self, addr: &str) -> Option<LocationRecord> {
        let addr = addr.trim();
        if addr.is_empty() || is_reserved_addr(addr) || self.classifier.is_platform_addr(addr) {
            debug!("Skipping geo lookup for non-routable address: {addr:?}");
            return None;
        }

        let url = format!("{}/{}?fields={}", self.endpoint, addr, GEO_RESPONSE_FIELDS);
        let response = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                record_geo_error(&self.stats, &e);
                warn!("Geo lookup for {addr} failed: {e}");
                return None;
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                record_geo_error(&self.stats, &e);
                warn!("Geo lookup for {addr} returned error status: {e}");
                return None;
            }
        };

        let api: GeoApiResponse = match response.json().await {
            Ok(api) => api,
            Err(e) => {
                record_geo_error(&self.stats, &e);
                warn!("Geo lookup for {addr} returned undecodable body: {e}");
                return None;
            }
        };

        if api.status.as_deref() == Some("fail") {
            self.stats.increment_warning(WarningType::GeoLookupNoData);
            warn!(
                "Geo lookup for {addr} returned no data: {}",
                api.message.as_deref().unwrap_or("no reason given")
            );
            return None;
        }

        Some(LocationRecord::from(api))
    }
}

/// Whether `addr` is loopback, private-range, link-local, unspecified, or
/// not an IP literal at all. None of these are worth an upstream lookup.
fn is_reserved_addr(addr: &str) -> bool {
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        Ok(IpAddr::V6(v6)) => {
            let segments = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (segments[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (segments[0] & 0xffc0) == 0xfe80
        }
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error_handling::ErrorType;

    fn resolver_against(endpoint: &str, stats: Arc<GateStats>) -> GeoResolver {
        GeoResolver::new(
            Arc::new(reqwest::Client::new()),
            endpoint,
            Duration::from_millis(400),
            Arc::new(InfraClassifier::new()),
            stats,
        )
    }

    #[test]
    fn test_reserved_addresses() {
        for addr in [
            "127.0.0.1",
            "10.1.2.3",
            "192.168.0.10",
            "172.16.5.5",
            "169.254.1.1",
            "0.0.0.0",
            "::1",
            "fc00::1",
            "fe80::1",
            "not-an-ip",
            "",
        ] {
            assert!(is_reserved_addr(addr), "{addr} should be reserved");
        }
        for addr in ["8.8.8.8", "203.0.113.7", "2001:4860:4860::8888"] {
            assert!(!is_reserved_addr(addr), "{addr} should be routable");
        }
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/203.0.113.7"))
            .and(query_param("fields", GEO_RESPONSE_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{
                    "status": "success",
                    "country": "Thailand",
                    "countryCode": "th",
                    "regionName": "Bangkok",
                    "city": "Bangkok",
                    "timezone": "Asia/Bangkok",
                    "isp": "True Internet",
                    "org": "True Online",
                    "proxy": false,
                    "hosting": false
                }"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let stats = Arc::new(GateStats::new());
        let resolver = resolver_against(&format!("{}/json", server.uri()), Arc::clone(&stats));

        let record = resolver.resolve("203.0.113.7").await.unwrap();
        assert_eq!(record.country_code.as_deref(), Some("TH"));
        assert_eq!(record.city.as_deref(), Some("Bangkok"));
        assert!(!record.is_vpn());
        assert_eq!(stats.total_errors(), 0);
    }

    #[tokio::test]
    async fn test_resolve_skips_reserved_and_platform_addresses() {
        // Endpoint that would fail loudly if contacted.
        let stats = Arc::new(GateStats::new());
        let resolver = resolver_against("http://127.0.0.1:1/json", Arc::clone(&stats));

        assert!(resolver.resolve("127.0.0.1").await.is_none());
        assert!(resolver.resolve("192.168.1.44").await.is_none());
        assert!(resolver.resolve("76.76.21.9").await.is_none());
        assert!(resolver.resolve("garbage").await.is_none());
        // No network attempt means no recorded errors.
        assert_eq!(stats.total_errors(), 0);
    }

    #[tokio::test]
    async fn test_resolve_fail_status_from_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"status": "fail", "message": "reserved range"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let stats = Arc::new(GateStats::new());
        let resolver = resolver_against(&format!("{}/json", server.uri()), Arc::clone(&stats));

        assert!(resolver.resolve("203.0.113.7").await.is_none());
        assert_eq!(stats.get_warning_count(WarningType::GeoLookupNoData), 1);
    }

    #[tokio::test]
    async fn test_resolve_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let stats = Arc::new(GateStats::new());
        let resolver = resolver_against(&format!("{}/json", server.uri()), Arc::clone(&stats));

        assert!(resolver.resolve("203.0.113.7").await.is_none());
        assert_eq!(
            stats.get_error_count(ErrorType::GeoLookupStatusError),
            1
        );
    }

    #[tokio::test]
    async fn test_resolve_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"status": "success"}"#, "application/json")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let stats = Arc::new(GateStats::new());
        let resolver = resolver_against(&format!("{}/json", server.uri()), Arc::clone(&stats));

        assert!(resolver.resolve("203.0.113.7").await.is_none());
        assert_eq!(stats.get_error_count(ErrorType::GeoLookupTimeout), 1);
    }

    #[tokio::test]
    async fn test_resolve_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "application/json"))
            .mount(&server)
            .await;

        let stats = Arc::new(GateStats::new());
        let resolver = resolver_against(&format!("{}/json", server.uri()), Arc::clone(&stats));

        assert!(resolver.resolve("203.0.113.7").await.is_none());
        assert_eq!(
            stats.get_error_count(ErrorType::GeoLookupDecodeError),
            1
        );
    }
}
