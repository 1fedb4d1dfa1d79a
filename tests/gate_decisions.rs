//! End-to-end tests for the access gate's decision algorithm.
//!
//! These drive [`geogate::AccessGate::decide`] against a real SQLite
//! blocklist and a mock geolocation server. No real network requests are
//! made, so every failure path can be provoked deliberately.

use geogate::{
    Decision, DecisionReason, ErrorType, GatePolicy, InfoType, RequestContext, TrackedSurface,
    Verdict, WarningType,
};

#[path = "helpers.rs"]
mod helpers;

use helpers::{build_gate, create_test_pool, geo_endpoint, mock_geo_server, seed_blocked_country};

/// A geo endpoint that refuses connections, for fail-open tests.
const DEAD_GEO_ENDPOINT: &str = "http://127.0.0.1:1/json";

fn browser_ctx(path: &str, origin: &str) -> RequestContext {
    let mut ctx = RequestContext::new(path);
    ctx.origin = Some(origin.to_string());
    ctx.user_agent = Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/126.0".to_string());
    ctx
}

fn assert_verdict(decision: &Decision, verdict: Verdict, reason: DecisionReason) {
    assert_eq!(decision.verdict, verdict);
    assert_eq!(decision.reason, reason);
}

/// A visitor resolved to a blocked country is redirected.
#[tokio::test]
async fn test_blocked_country_is_redirected() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    let server = mock_geo_server("Russia", "RU", false, false).await;
    let fixture = build_gate(pool, &geo_endpoint(&server), GatePolicy::default());

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::RedirectBlocked, DecisionReason::CountryBlocked);
    assert_eq!(decision.country.as_deref(), Some("RU"));
    assert!(decision.should_track, "home page visits are tracked");
    let location = decision.location.expect("resolver produced a location");
    assert_eq!(location.city.as_deref(), Some("Test City"));
    assert_eq!(fixture.stats.redirected_count(), 1);
    assert_eq!(fixture.stats.allowed_count(), 0);
}

/// A visitor from a blocked country coming through a VPN exit is allowed
/// under the default policy.
#[tokio::test]
async fn test_vpn_visitor_bypasses_block() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    let server = mock_geo_server("Russia", "RU", true, false).await;
    let fixture = build_gate(pool, &geo_endpoint(&server), GatePolicy::default());

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::Allow, DecisionReason::VpnBypass);
    assert_eq!(decision.country.as_deref(), Some("RU"));
    assert!(decision.should_track);
    assert_eq!(fixture.stats.get_info_count(InfoType::VpnBypassAllowed), 1);
    assert_eq!(fixture.stats.redirected_count(), 0);
}

/// With the bypass policy off, VPN traffic from blocked countries is
/// redirected like any other.
#[tokio::test]
async fn test_vpn_bypass_can_be_disabled() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    let server = mock_geo_server("Russia", "RU", true, false).await;
    let policy = GatePolicy {
        vpn_bypass: false,
        ..Default::default()
    };
    let fixture = build_gate(pool, &geo_endpoint(&server), policy);

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::RedirectBlocked, DecisionReason::CountryBlocked);
    assert_eq!(fixture.stats.get_info_count(InfoType::VpnBypassAllowed), 0);
}

/// The edge-supplied country hint wins over the resolver's answer, and is
/// normalized to upper case first.
#[tokio::test]
async fn test_edge_hint_takes_precedence() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "GB", "United Kingdom", None).await;
    // The resolver disagrees with the edge; the edge wins.
    let server = mock_geo_server("France", "FR", false, false).await;
    let fixture = build_gate(pool, &geo_endpoint(&server), GatePolicy::default());

    let mut ctx = browser_ctx("/", "203.0.113.80");
    ctx.country_hint = Some(" gb ".to_string());
    let decision = fixture.gate.decide(&ctx).await;

    assert_verdict(&decision, Verdict::RedirectBlocked, DecisionReason::CountryBlocked);
    assert_eq!(decision.country.as_deref(), Some("GB"));
    assert_eq!(fixture.stats.get_info_count(InfoType::EdgeHintPreferred), 1);
}

/// A visitor from an unblocked country passes.
#[tokio::test]
async fn test_unblocked_country_is_allowed() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    let server = mock_geo_server("Thailand", "TH", false, false).await;
    let fixture = build_gate(pool, &geo_endpoint(&server), GatePolicy::default());

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::Allow, DecisionReason::NotBlocked);
    assert_eq!(decision.country.as_deref(), Some("TH"));
    assert_eq!(fixture.stats.allowed_count(), 1);
}

/// When the geo service is down and no hint exists, the country stays
/// unknown and the visitor is allowed.
#[tokio::test]
async fn test_geo_outage_fails_open() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    let fixture = build_gate(pool, DEAD_GEO_ENDPOINT, GatePolicy::default());

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::Allow, DecisionReason::NotBlocked);
    assert_eq!(decision.country, None);
    assert_eq!(decision.location, None);
    assert!(decision.should_track, "tracking still fires without location");
    assert_eq!(
        fixture.stats.get_error_count(ErrorType::GeoLookupConnectError),
        1
    );
}

/// The hint alone is enough to block; the resolver being down does not
/// loosen the gate for hinted traffic.
#[tokio::test]
async fn test_hint_blocks_even_without_geo() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    let fixture = build_gate(pool, DEAD_GEO_ENDPOINT, GatePolicy::default());

    let mut ctx = browser_ctx("/", "203.0.113.80");
    ctx.country_hint = Some("RU".to_string());
    let decision = fixture.gate.decide(&ctx).await;

    assert_verdict(&decision, Verdict::RedirectBlocked, DecisionReason::CountryBlocked);
    assert_eq!(decision.country.as_deref(), Some("RU"));
    // No resolver data means no VPN signal, so the bypass cannot trigger.
    assert_eq!(fixture.stats.get_info_count(InfoType::VpnBypassAllowed), 0);
}

/// An entry whose expiration has passed no longer blocks.
#[tokio::test]
async fn test_expired_block_no_longer_matches() {
    let pool = create_test_pool().await;
    let past = chrono::Utc::now().timestamp_millis() - 60_000;
    seed_blocked_country(&pool, "RU", "Russia", Some(past)).await;
    let server = mock_geo_server("Russia", "RU", false, false).await;
    let fixture = build_gate(pool, &geo_endpoint(&server), GatePolicy::default());

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::Allow, DecisionReason::NotBlocked);
}

/// Platform-infrastructure requests are allowed, untracked, and never
/// trigger a geo lookup.
#[tokio::test]
async fn test_infra_request_is_exempt_and_untracked() {
    let pool = create_test_pool().await;
    seed_blocked_country(&pool, "RU", "Russia", None).await;
    // An endpoint that would error loudly if the gate consulted it.
    let fixture = build_gate(pool, DEAD_GEO_ENDPOINT, GatePolicy::default());

    let mut ctx = RequestContext::new("/");
    ctx.origin = Some("203.0.113.80".to_string());
    ctx.user_agent = Some("Mozilla/5.0 (compatible; vercel-screenshot/1.0)".to_string());
    let decision = fixture.gate.decide(&ctx).await;

    assert_verdict(&decision, Verdict::Allow, DecisionReason::Infrastructure);
    assert!(!decision.should_track);
    assert_eq!(decision.country, None);
    assert_eq!(fixture.stats.get_info_count(InfoType::InfraExempted), 1);
    // Short-circuited before blocklist and resolver: no errors recorded.
    assert_eq!(fixture.stats.total_errors(), 0);
}

/// When the blocklist store breaks, the gate serves the empty set and
/// allows traffic rather than failing requests.
#[tokio::test]
async fn test_broken_blocklist_store_fails_open() {
    let pool = create_test_pool().await;
    let server = mock_geo_server("Russia", "RU", false, false).await;
    let fixture = build_gate(pool.clone(), &geo_endpoint(&server), GatePolicy::default());
    pool.close().await;

    let decision = fixture.gate.decide(&browser_ctx("/", "203.0.113.80")).await;

    assert_verdict(&decision, Verdict::Allow, DecisionReason::NotBlocked);
    assert_eq!(decision.country.as_deref(), Some("RU"));
    assert_eq!(
        fixture
            .stats
            .get_warning_count(WarningType::BlocklistFailOpenEmpty),
        1
    );
}

/// An admin mutation through the cache is visible to the very next
/// decision; the write invalidates the snapshot.
#[tokio::test]
async fn test_admin_update_visible_to_next_decision() {
    let pool = create_test_pool().await;
    let server = mock_geo_server("Thailand", "TH", false, false).await;
    let fixture = build_gate(pool, &geo_endpoint(&server), GatePolicy::default());

    let ctx = browser_ctx("/", "203.0.113.80");
    let before = fixture.gate.decide(&ctx).await;
    assert_eq!(before.verdict, Verdict::Allow);

    fixture
        .blocklist
        .set_blocked(
            &["TH".to_string()],
            geogate::BlockDuration::Permanent,
        )
        .await
        .expect("set_blocked should succeed");

    let after = fixture.gate.decide(&ctx).await;
    assert_verdict(&after, Verdict::RedirectBlocked, DecisionReason::CountryBlocked);
}

/// The configured tracked surface, not the verdict, decides whether a
/// request fires tracking.
#[tokio::test]
async fn test_tracked_surface_policy_is_honored() {
    let pool = create_test_pool().await;
    let policy = GatePolicy {
        tracked_surface: TrackedSurface::AllPages {
            exempt_prefixes: vec!["/api".to_string()],
        },
        ..Default::default()
    };
    // No origin, no hint: the verdict side is a plain allow throughout.
    let fixture = build_gate(pool, DEAD_GEO_ENDPOINT, policy);

    let page = fixture.gate.decide(&RequestContext::new("/products/42")).await;
    assert!(page.should_track);

    let api = fixture.gate.decide(&RequestContext::new("/api/cart")).await;
    assert!(!api.should_track);

    let asset = fixture.gate.decide(&RequestContext::new("/logo.svg")).await;
    assert!(!asset.should_track);
}
