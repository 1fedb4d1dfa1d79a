//! Per-request context for the gating pipeline.
//!
//! The host HTTP layer assembles a [`RequestContext`] at request entry from
//! whatever transport it sits behind (direct socket, reverse proxy, edge
//! network) and hands it to the gate. Nothing in here is persisted; the
//! context is dropped at request exit.

use rand::distr::Alphanumeric;
use rand::Rng as _;

use crate::config::CLIENT_ID_LEN;

/// Everything the gate needs to know about one inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request path, e.g. `/products/42`.
    pub path: String,
    /// Client network address as seen by the edge, if known.
    pub origin: Option<String>,
    /// Country code supplied by the edge network, if any. Takes precedence
    /// over the resolver's own guess.
    pub country_hint: Option<String>,
    /// Raw User-Agent header value.
    pub user_agent: Option<String>,
    /// Remaining request headers, in arrival order.
    pub headers: Vec<(String, String)>,
    /// Stable per-client identifier carried by the client, if present.
    pub client_id: Option<String>,
    /// Whether the client carries the short-lived "visited home" marker.
    pub visited_home: bool,
}

impl RequestContext {
    /// Creates a context for `path` with everything else unset.
    pub fn new(path: impl Into<String>) -> Self {
        RequestContext {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Extracts the client address from proxy headers.
///
/// Prefers the first hop of `X-Forwarded-For` (the original client in a
/// well-behaved proxy chain), falling back to `X-Real-IP`. Returns `None`
/// when neither header carries a usable value.
pub fn client_addr_from_headers(headers: &[(String, String)]) -> Option<String> {
    let lookup = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    };

    if let Some(forwarded) = lookup("x-forwarded-for") {
        let first_hop = forwarded.split(',').next().unwrap_or("").trim();
        if !first_hop.is_empty() {
            return Some(first_hop.to_string());
        }
    }
    lookup("x-real-ip")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Generates a fresh client identifier for first-time visitors.
///
/// Alphanumeric so it survives cookie and header encoding untouched.
pub fn generate_client_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CLIENT_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut ctx = RequestContext::new("/");
        ctx.headers = vec![
            ("X-Vercel-ID".to_string(), "abc123".to_string()),
            ("Accept".to_string(), "text/html".to_string()),
        ];
        assert_eq!(ctx.header("x-vercel-id"), Some("abc123"));
        assert_eq!(ctx.header("ACCEPT"), Some("text/html"));
        assert_eq!(ctx.header("cookie"), None);
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let headers = vec![(
            "X-Forwarded-For".to_string(),
            "203.0.113.7, 10.0.0.1, 172.16.0.9".to_string(),
        )];
        assert_eq!(
            client_addr_from_headers(&headers),
            Some("203.0.113.7".to_string())
        );
    }

    #[test]
    fn test_real_ip_fallback() {
        let headers = vec![
            ("X-Forwarded-For".to_string(), "  ".to_string()),
            ("X-Real-IP".to_string(), "198.51.100.4".to_string()),
        ];
        assert_eq!(
            client_addr_from_headers(&headers),
            Some("198.51.100.4".to_string())
        );
        assert_eq!(client_addr_from_headers(&[]), None);
    }

    #[test]
    fn test_generated_client_ids_are_unique_alphanumeric() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_eq!(a.len(), CLIENT_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
