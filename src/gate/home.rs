//! Home-page-first companion gate.
//!
//! First-time clients must land on the home page before browsing anywhere
//! else. The gate runs off a short-lived "visited home" marker the host
//! layer persists on the client; requests without the marker get redirected
//! to the home path unless they target an exempt surface.
//!
//! Independent of the country gate: a request can pass one and fail the
//! other, and the two never share state.

use crate::config::{BLOCKED_PAGE_PATH, GATE_EXEMPT_PREFIXES, HOME_PATH};

/// Outcome of evaluating the home gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeVerdict {
    /// Serve the request unchanged.
    Pass,
    /// Serve the request and (re)set the visited-home marker on the way out.
    PassAndSetMarker,
    /// Send the client to the home path first.
    RedirectToHome,
}

/// The "must visit home first" state machine.
#[derive(Debug, Clone)]
pub struct HomeGate {
    home_path: String,
    blocked_page: String,
    exempt_prefixes: Vec<String>,
}

impl Default for HomeGate {
    fn default() -> Self {
        HomeGate {
            home_path: HOME_PATH.to_string(),
            blocked_page: BLOCKED_PAGE_PATH.to_string(),
            exempt_prefixes: GATE_EXEMPT_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl HomeGate {
    /// Gate with the stock paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate with custom paths, for hosts that mount the storefront somewhere
    /// other than `/`.
    pub fn with_paths(
        home_path: impl Into<String>,
        blocked_page: impl Into<String>,
        exempt_prefixes: Vec<String>,
    ) -> Self {
        HomeGate {
            home_path: home_path.into(),
            blocked_page: blocked_page.into(),
            exempt_prefixes,
        }
    }

    /// Evaluates one request path against the marker state.
    ///
    /// The home path always answers [`HomeVerdict::PassAndSetMarker`] so a
    /// revisit refreshes the marker's lifetime. Exempt surfaces (API, admin,
    /// internals, the blocked page, and dot-containing asset paths) pass
    /// regardless of marker state; everything else requires the marker.
    pub fn evaluate(&self, path: &str, visited_home: bool) -> HomeVerdict {
        if path == self.home_path {
            return HomeVerdict::PassAndSetMarker;
        }
        if self.is_exempt(path) {
            return HomeVerdict::Pass;
        }
        if visited_home {
            HomeVerdict::Pass
        } else {
            HomeVerdict::RedirectToHome
        }
    }

    /// The path clients get redirected to when they lack the marker.
    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    fn is_exempt(&self, path: &str) -> bool {
        if path == self.blocked_page {
            return true;
        }
        // Asset requests carry a file extension; the gate is for pages.
        if path.contains('.') {
            return true;
        }
        self.exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_path_sets_marker() {
        let gate = HomeGate::new();
        assert_eq!(gate.evaluate("/", false), HomeVerdict::PassAndSetMarker);
        // Revisits refresh the marker.
        assert_eq!(gate.evaluate("/", true), HomeVerdict::PassAndSetMarker);
    }

    #[test]
    fn test_unvisited_client_redirected_from_pages() {
        let gate = HomeGate::new();
        assert_eq!(
            gate.evaluate("/products/42", false),
            HomeVerdict::RedirectToHome
        );
        assert_eq!(gate.evaluate("/checkout", false), HomeVerdict::RedirectToHome);
    }

    #[test]
    fn test_visited_client_passes() {
        let gate = HomeGate::new();
        assert_eq!(gate.evaluate("/products/42", true), HomeVerdict::Pass);
    }

    #[test]
    fn test_exempt_surfaces_pass_without_marker() {
        let gate = HomeGate::new();
        for path in [
            "/api/cart",
            "/admin/blocked-countries",
            "/_next/static/chunk.js",
            "/uploads/banner.png",
            "/blocked",
            "/favicon.ico",
            "/styles/site.css",
        ] {
            assert_eq!(gate.evaluate(path, false), HomeVerdict::Pass, "{path}");
        }
    }

    #[test]
    fn test_custom_paths() {
        let gate = HomeGate::with_paths("/shop", "/unavailable", vec!["/api".to_string()]);
        assert_eq!(gate.evaluate("/shop", false), HomeVerdict::PassAndSetMarker);
        assert_eq!(gate.evaluate("/unavailable", false), HomeVerdict::Pass);
        assert_eq!(gate.evaluate("/", false), HomeVerdict::RedirectToHome);
        assert_eq!(gate.home_path(), "/shop");
    }
}
