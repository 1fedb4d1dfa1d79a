//! The access gate: a per-request allow/redirect decision engine.
//!
//! Combines the infrastructure classifier, the blocklist cache, and the geo
//! resolver into one verdict per request, plus a separate call on whether
//! the visit should be tracked. Everything upstream of the gate is allowed
//! to fail; the gate itself always produces a verdict.
//!
//! Decision order per request:
//! 1. Platform infrastructure short-circuits to allow, untracked
//! 2. Edge country hint (if present) is upper-cased and preferred
//! 3. Blocklist snapshot is fetched (cache hit or refresh)
//! 4. Geo lookup runs for the origin address; it may produce nothing
//! 5. A blocklist match redirects unless the visitor looks like a VPN exit
//!    and the bypass policy is on

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::blocklist::BlocklistCache;
use crate::config::{BLOCKED_PAGE_PATH, GATE_EXEMPT_PREFIXES, HOME_PATH, TrackedSurfaceKind};
use crate::error_handling::{GateStats, InfoType};
use crate::geo::{GeoResolver, LocationRecord};
use crate::infra::InfraClassifier;
use crate::request::RequestContext;

mod home;

pub use home::{HomeGate, HomeVerdict};

/// Terminal outcome of the country gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Serve the request.
    Allow,
    /// Redirect the client to the blocked page.
    RedirectBlocked,
}

/// Why the gate answered the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Platform-internal request; gating skipped entirely.
    Infrastructure,
    /// Effective country is on the blocklist.
    CountryBlocked,
    /// Country is blocked, but the visitor came through a VPN/proxy and the
    /// bypass policy lets them through.
    VpnBypass,
    /// No blocklist match (including "country unknown").
    NotBlocked,
}

/// One gate decision, with enough context for the caller to act and for the
/// visit event to be descriptive.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Allow or redirect.
    pub verdict: Verdict,
    /// Why.
    pub reason: DecisionReason,
    /// The country code the decision was based on, if any was determined.
    pub country: Option<String>,
    /// Full location record when the resolver produced one.
    pub location: Option<LocationRecord>,
    /// Whether the caller should fire visit tracking for this request.
    pub should_track: bool,
}

/// Which requests fire visit tracking.
///
/// Explicit configuration rather than per-route conditions scattered through
/// handler code; the deployment picks one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedSurface {
    /// Only the home path is tracked.
    HomeOnly {
        /// The tracked path, normally `/`.
        home_path: String,
    },
    /// Every page except exempt prefixes and asset (dot-containing) paths.
    AllPages {
        /// Prefixes that never track: API, admin, internals, blocked page.
        exempt_prefixes: Vec<String>,
    },
    /// Tracking disabled.
    Disabled,
}

impl TrackedSurface {
    /// Whether a visit to `path` should be tracked.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            TrackedSurface::HomeOnly { home_path } => path == home_path,
            TrackedSurface::AllPages { exempt_prefixes } => {
                !path.contains('.')
                    && !exempt_prefixes
                        .iter()
                        .any(|prefix| path.starts_with(prefix.as_str()))
            }
            TrackedSurface::Disabled => false,
        }
    }
}

impl From<TrackedSurfaceKind> for TrackedSurface {
    fn from(kind: TrackedSurfaceKind) -> Self {
        match kind {
            TrackedSurfaceKind::Home => TrackedSurface::HomeOnly {
                home_path: HOME_PATH.to_string(),
            },
            TrackedSurfaceKind::All => {
                let mut exempt_prefixes: Vec<String> = GATE_EXEMPT_PREFIXES
                    .iter()
                    .map(|p| p.to_string())
                    .collect();
                exempt_prefixes.push(BLOCKED_PAGE_PATH.to_string());
                TrackedSurface::AllPages { exempt_prefixes }
            }
            TrackedSurfaceKind::Off => TrackedSurface::Disabled,
        }
    }
}

/// Gate policy knobs, fixed at construction.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    /// Whether VPN/proxy visitors from blocked countries are let through.
    pub vpn_bypass: bool,
    /// Which requests fire visit tracking.
    pub tracked_surface: TrackedSurface,
}

impl Default for GatePolicy {
    fn default() -> Self {
        GatePolicy {
            vpn_bypass: true,
            tracked_surface: TrackedSurface::HomeOnly {
                home_path: HOME_PATH.to_string(),
            },
        }
    }
}

/// The decision engine. One instance per process, shared across requests.
pub struct AccessGate {
    blocklist: Arc<BlocklistCache>,
    geo: Arc<GeoResolver>,
    infra: Arc<InfraClassifier>,
    policy: GatePolicy,
    stats: Arc<GateStats>,
}

impl AccessGate {
    /// Assembles a gate from its collaborators.
    pub fn new(
        blocklist: Arc<BlocklistCache>,
        geo: Arc<GeoResolver>,
        infra: Arc<InfraClassifier>,
        policy: GatePolicy,
        stats: Arc<GateStats>,
    ) -> Self {
        AccessGate {
            blocklist,
            geo,
            infra,
            policy,
            stats,
        }
    }

    /// Decides one request.
    ///
    /// Never fails: blocklist trouble degrades to an empty set and geo
    /// trouble to "location unknown", both of which land on the allow side.
    pub async fn decide(&self, ctx: &RequestContext) -> Decision {
        if self.infra.is_internal(ctx) {
            self.stats.increment_info(InfoType::InfraExempted);
            self.stats.record_allowed();
            debug!("Infrastructure request for {} allowed, untracked", ctx.path);
            return Decision {
                verdict: Verdict::Allow,
                reason: DecisionReason::Infrastructure,
                country: None,
                location: None,
                should_track: false,
            };
        }

        let hint_country = ctx
            .country_hint
            .as_deref()
            .map(|hint| hint.trim().to_ascii_uppercase())
            .filter(|hint| !hint.is_empty());

        let blocked = self.blocklist.active_codes().await;

        // The resolver is consulted even when a hint exists: VPN detection
        // and the rich location fields for tracking only come from it.
        let location = match ctx.origin.as_deref() {
            Some(origin) => self.geo.resolve(origin).await,
            None => None,
        };
        let is_vpn = location.as_ref().map(LocationRecord::is_vpn).unwrap_or(false);

        if hint_country.is_some()
            && location
                .as_ref()
                .is_some_and(|loc| loc.country_code.is_some())
        {
            self.stats.increment_info(InfoType::EdgeHintPreferred);
        }

        let country = hint_country
            .or_else(|| location.as_ref().and_then(|loc| loc.country_code.clone()));

        // Tracking is independent of the verdict; only infra skips it.
        let should_track = self.policy.tracked_surface.matches(&ctx.path);

        if let Some(code) = country.as_deref() {
            if blocked.contains(code) {
                if is_vpn && self.policy.vpn_bypass {
                    self.stats.increment_info(InfoType::VpnBypassAllowed);
                    self.stats.record_allowed();
                    info!("VPN visitor from blocked country {code} allowed through");
                    return Decision {
                        verdict: Verdict::Allow,
                        reason: DecisionReason::VpnBypass,
                        country,
                        location,
                        should_track,
                    };
                }
                self.stats.record_redirected();
                info!("Visitor from blocked country {code} redirected");
                return Decision {
                    verdict: Verdict::RedirectBlocked,
                    reason: DecisionReason::CountryBlocked,
                    country,
                    location,
                    should_track,
                };
            }
        }

        self.stats.record_allowed();
        Decision {
            verdict: Verdict::Allow,
            reason: DecisionReason::NotBlocked,
            country,
            location,
            should_track,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_only_surface() {
        let surface = TrackedSurface::HomeOnly {
            home_path: "/".to_string(),
        };
        assert!(surface.matches("/"));
        assert!(!surface.matches("/products/42"));
        assert!(!surface.matches("/api/cart"));
    }

    #[test]
    fn test_all_pages_surface_exemptions() {
        let surface = TrackedSurface::from(TrackedSurfaceKind::All);
        assert!(surface.matches("/"));
        assert!(surface.matches("/products/42"));
        assert!(!surface.matches("/api/cart"));
        assert!(!surface.matches("/admin/blocked-countries"));
        assert!(!surface.matches("/blocked"));
        assert!(!surface.matches("/logo.svg"));
    }

    #[test]
    fn test_disabled_surface() {
        let surface = TrackedSurface::from(TrackedSurfaceKind::Off);
        assert!(!surface.matches("/"));
        assert!(!surface.matches("/products/42"));
    }

    #[test]
    fn test_verdict_serialization() {
        assert_eq!(
            serde_json::to_string(&Verdict::RedirectBlocked).unwrap(),
            "\"redirect_blocked\""
        );
        assert_eq!(
            serde_json::to_string(&DecisionReason::VpnBypass).unwrap(),
            "\"vpn_bypass\""
        );
    }
}
