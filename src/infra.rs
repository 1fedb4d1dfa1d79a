//! Internal-infrastructure request classification.
//!
//! Hosting platforms probe deployments with their own synthetic traffic:
//! screenshot crawlers, health checks, cache revalidations. Those requests
//! must not show up in visit tracking and must not burn geo lookups, so the
//! gate exempts them up front. Classification is a heuristic allow-list
//! only; it never widens the country block for external-looking traffic.

use crate::request::RequestContext;

/// User-Agent substrings of known platform monitors and screenshot crawlers.
const DEFAULT_UA_SIGNATURES: &[&str] = &["vercel-screenshot", "vercel-favicon"];

/// Platform name token; combined with [`DEFAULT_BOT_TOKEN`] it catches
/// platform bots that do not match a fixed signature.
const DEFAULT_PLATFORM_TOKEN: &str = "vercel";

/// Generic bot token paired with the platform token.
const DEFAULT_BOT_TOKEN: &str = "bot";

/// Address prefixes the platform originates synthetic traffic from.
const DEFAULT_ADDR_PREFIXES: &[&str] = &["76.76.21."];

/// Headers the platform attaches to requests it already routed or rewrote
/// internally, e.g. cache revalidation callbacks.
const DEFAULT_MARKER_HEADERS: &[&str] = &["x-vercel-internal", "x-prerender-revalidate"];

/// Recognizes requests originating from the hosting platform itself.
#[derive(Debug, Clone)]
pub struct InfraClassifier {
    ua_signatures: Vec<String>,
    platform_token: String,
    bot_token: String,
    addr_prefixes: Vec<String>,
    marker_headers: Vec<String>,
}

impl Default for InfraClassifier {
    fn default() -> Self {
        InfraClassifier {
            ua_signatures: DEFAULT_UA_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            platform_token: DEFAULT_PLATFORM_TOKEN.to_string(),
            bot_token: DEFAULT_BOT_TOKEN.to_string(),
            addr_prefixes: DEFAULT_ADDR_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            marker_headers: DEFAULT_MARKER_HEADERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl InfraClassifier {
    /// Classifier with the stock platform signatures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with custom signature sets, for deployments behind a
    /// different platform. Tokens are matched lower-cased.
    pub fn with_signatures(
        ua_signatures: Vec<String>,
        platform_token: String,
        bot_token: String,
        addr_prefixes: Vec<String>,
        marker_headers: Vec<String>,
    ) -> Self {
        InfraClassifier {
            ua_signatures: ua_signatures
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            platform_token: platform_token.to_lowercase(),
            bot_token: bot_token.to_lowercase(),
            addr_prefixes,
            marker_headers: marker_headers
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    /// Whether this request comes from the platform's own infrastructure.
    ///
    /// True if ANY of:
    /// - the User-Agent matches a known monitor/screenshot signature,
    /// - the User-Agent contains both the platform token and a bot token,
    /// - the origin address falls in a platform address prefix,
    /// - the request carries an internal routing/cache marker header.
    pub fn is_internal(&self, ctx: &RequestContext) -> bool {
        if let Some(ua) = ctx.user_agent.as_deref() {
            let ua = ua.to_lowercase();
            if self.ua_signatures.iter().any(|sig| ua.contains(sig)) {
                return true;
            }
            if ua.contains(&self.platform_token) && ua.contains(&self.bot_token) {
                return true;
            }
        }

        if let Some(origin) = ctx.origin.as_deref() {
            if self.is_platform_addr(origin) {
                return true;
            }
        }

        self.marker_headers
            .iter()
            .any(|marker| ctx.header(marker).is_some())
    }

    /// Whether the address belongs to a platform infrastructure range.
    ///
    /// Shared with the geo resolver, which skips lookups for these
    /// addresses entirely.
    pub fn is_platform_addr(&self, addr: &str) -> bool {
        let addr = addr.trim();
        if addr.is_empty() {
            return false;
        }
        self.addr_prefixes
            .iter()
            .any(|prefix| addr.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_ua(ua: &str) -> RequestContext {
        let mut ctx = RequestContext::new("/");
        ctx.user_agent = Some(ua.to_string());
        ctx
    }

    #[test]
    fn test_screenshot_signature() {
        let classifier = InfraClassifier::new();
        assert!(classifier.is_internal(&ctx_with_ua(
            "Mozilla/5.0 (compatible; vercel-screenshot/1.0)"
        )));
        assert!(classifier.is_internal(&ctx_with_ua("vercel-favicon/1.0")));
    }

    #[test]
    fn test_platform_bot_token_pair() {
        let classifier = InfraClassifier::new();
        assert!(classifier.is_internal(&ctx_with_ua("Vercel Edge Bot/2.1")));
        // Either token alone is not enough.
        assert!(!classifier.is_internal(&ctx_with_ua("Vercel Edge Runtime")));
        assert!(!classifier.is_internal(&ctx_with_ua("Googlebot/2.1")));
    }

    #[test]
    fn test_platform_address_prefix() {
        let classifier = InfraClassifier::new();
        let mut ctx = RequestContext::new("/");
        ctx.origin = Some("76.76.21.22".to_string());
        assert!(classifier.is_internal(&ctx));
        assert!(classifier.is_platform_addr("76.76.21.9"));
        assert!(!classifier.is_platform_addr("76.76.210.9"));
        assert!(!classifier.is_platform_addr("203.0.113.7"));
    }

    #[test]
    fn test_marker_header() {
        let classifier = InfraClassifier::new();
        let mut ctx = RequestContext::new("/");
        ctx.headers = vec![(
            "X-Prerender-Revalidate".to_string(),
            "token".to_string(),
        )];
        assert!(classifier.is_internal(&ctx));
    }

    #[test]
    fn test_ordinary_browser_is_external() {
        let classifier = InfraClassifier::new();
        let mut ctx = ctx_with_ua(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36",
        );
        ctx.origin = Some("203.0.113.7".to_string());
        assert!(!classifier.is_internal(&ctx));
    }

    #[test]
    fn test_empty_context_is_external() {
        let classifier = InfraClassifier::new();
        assert!(!classifier.is_internal(&RequestContext::new("/")));
    }
}
