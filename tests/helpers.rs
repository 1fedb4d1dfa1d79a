// Shared test helpers for gating pipeline integration tests.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::SqlitePool;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use geogate::{
    build_router, run_migrations, AccessGate, AdminState, BlocklistCache, GatePolicy, GateStats,
    GeoResolver, HomeGate, InfraClassifier, NotificationSink, VisitEvent, VisitorTracker,
};

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Inserts a blocked-country row directly, bypassing the cache layer.
/// `expires_at` of `None` blocks permanently.
#[allow(dead_code)] // Used by other test files
pub async fn seed_blocked_country(
    pool: &SqlitePool,
    code: &str,
    name: &str,
    expires_at: Option<i64>,
) {
    let now_ms = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        "INSERT INTO blocked_countries (country_code, country_name, expires_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(code)
    .bind(name)
    .bind(expires_at)
    .bind(now_ms)
    .bind(now_ms)
    .execute(pool)
    .await
    .expect("Failed to seed blocked country");
}

/// Starts a mock geolocation server answering every lookup with the same
/// ip-api style success payload.
#[allow(dead_code)] // Used by other test files
pub async fn mock_geo_server(country: &str, code: &str, proxy: bool, hosting: bool) -> MockServer {
    let server = MockServer::start().await;
    let body = format!(
        r#"{{
            "status": "success",
            "country": "{country}",
            "countryCode": "{code}",
            "regionName": "Test Region",
            "city": "Test City",
            "timezone": "Etc/UTC",
            "isp": "Test ISP",
            "org": "Test Org",
            "proxy": {proxy},
            "hosting": {hosting}
        }}"#
    );
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;
    server
}

/// Geo endpoint base URL for a mock server, matching the resolver's
/// `{endpoint}/{addr}` URL convention.
#[allow(dead_code)] // Used by other test files
pub fn geo_endpoint(server: &MockServer) -> String {
    format!("{}/json", server.uri())
}

/// Sink that records every delivered event, for assertions on dispatch.
#[allow(dead_code)] // Used by other test files
pub struct RecordingSink {
    events: Mutex<Vec<VisitEvent>>,
}

#[allow(dead_code)] // Used by other test files
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSink {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn delivered_count(&self) -> usize {
        self.events.lock().expect("sink events lock poisoned").len()
    }

    pub fn delivered(&self) -> Vec<VisitEvent> {
        self.events
            .lock()
            .expect("sink events lock poisoned")
            .clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, event: &VisitEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .expect("sink events lock poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// An assembled gate plus the collaborators tests assert against.
#[allow(dead_code)] // Used by other test files
pub struct GateFixture {
    pub gate: AccessGate,
    pub blocklist: Arc<BlocklistCache>,
    pub stats: Arc<GateStats>,
}

/// Builds a gate over `pool` and `geo_endpoint` with short test timeouts.
#[allow(dead_code)] // Used by other test files
pub fn build_gate(pool: SqlitePool, geo_endpoint: &str, policy: GatePolicy) -> GateFixture {
    let stats = Arc::new(GateStats::new());
    let classifier = Arc::new(InfraClassifier::new());
    let blocklist = Arc::new(BlocklistCache::new(
        Arc::new(pool),
        Duration::from_secs(300),
        Duration::from_millis(500),
        Arc::clone(&stats),
    ));
    let geo = Arc::new(GeoResolver::new(
        Arc::new(reqwest::Client::new()),
        geo_endpoint,
        Duration::from_millis(500),
        Arc::clone(&classifier),
        Arc::clone(&stats),
    ));
    let gate = AccessGate::new(
        Arc::clone(&blocklist),
        geo,
        classifier,
        policy,
        Arc::clone(&stats),
    );
    GateFixture {
        gate,
        blocklist,
        stats,
    }
}

/// Builds an [`AdminState`] over `pool` and `geo_endpoint`, with a recording
/// sink behind its tracker so tests can observe notification dispatch.
#[allow(dead_code)] // Used by other test files
pub fn build_admin_state(pool: SqlitePool, geo_endpoint: &str) -> (AdminState, Arc<RecordingSink>) {
    let fixture = build_gate(pool, geo_endpoint, GatePolicy::default());
    let sink = RecordingSink::new();
    let tracker = Arc::new(VisitorTracker::new(
        1000,
        64,
        Arc::clone(&sink) as Arc<dyn NotificationSink>,
        Arc::clone(&fixture.stats),
    ));
    let state = AdminState {
        blocklist: Arc::clone(&fixture.blocklist),
        gate: Arc::new(fixture.gate),
        home_gate: Arc::new(HomeGate::new()),
        tracker,
        stats: Arc::clone(&fixture.stats),
        start_time: Arc::new(Instant::now()),
    };
    (state, sink)
}

/// Serves the admin router on an ephemeral port and returns its base URL.
/// The server task runs until the test process exits.
#[allow(dead_code)] // Used by other test files
pub async fn serve_admin(state: AdminState) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener
        .local_addr()
        .expect("Failed to read test listener address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Admin test server failed");
    });
    format!("http://{addr}")
}
