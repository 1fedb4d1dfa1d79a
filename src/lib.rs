//! geogate library: edge request gating for a storefront
//!
//! This library decides, per inbound request, whether to allow, redirect, or
//! silently track a visitor, based on geolocation, a database-backed country
//! blocklist, VPN/proxy detection, an internal-infrastructure exemption, and
//! a "must visit home page first" session gate. Decisions are fail-open by
//! design: no upstream failure ever blocks traffic by itself.
//!
//! # Example
//!
//! ```no_run
//! use geogate::{Config, run_server};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     port: 8787,
//!     ..Default::default()
//! };
//!
//! // Serves /decide, /admin/blocked-countries, and /status until shutdown.
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

mod admin;
mod blocklist;
pub mod config;
pub mod countries;
mod error_handling;
mod gate;
mod geo;
mod infra;
pub mod initialization;
mod request;
mod storage;
mod tracker;

// Re-export public API
pub use admin::{build_router, start_admin_server, AdminState};
pub use blocklist::BlocklistCache;
pub use config::{Config, LogFormat, LogLevel, TrackedSurfaceKind};
pub use error_handling::{BlocklistError, ErrorType, GateStats, InfoType, WarningType};
pub use gate::{
    AccessGate, Decision, DecisionReason, GatePolicy, HomeGate, HomeVerdict, TrackedSurface,
    Verdict,
};
pub use geo::{GeoResolver, LocationRecord};
pub use infra::InfraClassifier;
pub use request::{client_addr_from_headers, generate_client_id, RequestContext};
pub use run::{build_pipeline, run_server, Pipeline};
pub use storage::{run_migrations, BlockDuration, BlockedCountry};
pub use tracker::{NotificationSink, NullSink, VisitEvent, VisitorTracker, WebhookSink};

// Internal run module (contains the pipeline assembly and server loop)
mod run {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use log::info;
    use url::Url;

    use crate::admin::{start_admin_server, AdminState};
    use crate::blocklist::BlocklistCache;
    use crate::config::Config;
    use crate::error_handling::GateStats;
    use crate::gate::{AccessGate, GatePolicy, HomeGate};
    use crate::geo::GeoResolver;
    use crate::infra::InfraClassifier;
    use crate::initialization::init_client;
    use crate::storage::{init_db_pool_with_path, run_migrations};
    use crate::tracker::{NotificationSink, NullSink, VisitorTracker, WebhookSink};

    /// The assembled gating pipeline: every long-lived service instance,
    /// constructor-injected and shareable across request handlers.
    pub struct Pipeline {
        /// Cached view of the blocked-country set.
        pub blocklist: Arc<BlocklistCache>,
        /// The decision engine.
        pub gate: Arc<AccessGate>,
        /// Companion home-page-first gate.
        pub home_gate: Arc<HomeGate>,
        /// Deduplicated visit tracking.
        pub tracker: Arc<VisitorTracker>,
        /// Shared decision/error counters.
        pub stats: Arc<GateStats>,
    }

    impl std::fmt::Debug for Pipeline {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Pipeline").finish_non_exhaustive()
        }
    }

    /// Builds the pipeline from configuration.
    ///
    /// Opens (and migrates) the blocklist database, builds the shared HTTP
    /// client, and wires the cache, resolver, classifier, gate, and tracker
    /// together. No server is started; embedders can drive
    /// [`AccessGate::decide`] directly.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or migrated, when the HTTP
    /// client cannot be constructed, or when a configured URL is invalid.
    pub async fn build_pipeline(config: &Config) -> Result<Pipeline> {
        Url::parse(&config.geo_endpoint)
            .with_context(|| format!("Invalid geo endpoint URL: {}", config.geo_endpoint))?;
        if let Some(webhook_url) = &config.webhook_url {
            Url::parse(webhook_url)
                .with_context(|| format!("Invalid webhook URL: {webhook_url}"))?;
        }

        let stats = Arc::new(GateStats::new());

        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to initialize database pool")?;
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let client = init_client(config)
            .await
            .context("Failed to initialize HTTP client")?;

        let classifier = Arc::new(InfraClassifier::new());
        let blocklist = Arc::new(BlocklistCache::new(
            Arc::clone(&pool),
            Duration::from_secs(config.blocklist_ttl_secs),
            Duration::from_millis(config.blocklist_query_timeout_ms),
            Arc::clone(&stats),
        ));
        let geo = Arc::new(GeoResolver::new(
            Arc::clone(&client),
            &config.geo_endpoint,
            Duration::from_millis(config.geo_timeout_ms),
            Arc::clone(&classifier),
            Arc::clone(&stats),
        ));

        let policy = GatePolicy {
            vpn_bypass: config.vpn_bypass,
            tracked_surface: config.tracked_surface.into(),
        };
        info!(
            "Gate policy: vpn_bypass={}, tracked_surface={:?}",
            config.vpn_bypass, config.tracked_surface
        );

        let gate = Arc::new(AccessGate::new(
            Arc::clone(&blocklist),
            geo,
            classifier,
            policy,
            Arc::clone(&stats),
        ));
        let home_gate = Arc::new(HomeGate::new());

        let notification_sink: Arc<dyn NotificationSink> = match &config.webhook_url {
            Some(webhook_url) => {
                info!("Visit notifications will be posted to the configured webhook");
                Arc::new(WebhookSink::new(Arc::clone(&client), webhook_url))
            }
            None => {
                info!("No webhook configured; visit notifications are disabled");
                Arc::new(NullSink)
            }
        };
        let tracker = Arc::new(VisitorTracker::new(
            config.visitor_capacity,
            config.notification_queue_depth,
            notification_sink,
            Arc::clone(&stats),
        ));

        Ok(Pipeline {
            blocklist,
            gate,
            home_gate,
            tracker,
            stats,
        })
    }

    /// Builds the pipeline and serves the HTTP surface until shutdown.
    ///
    /// This is the main entry point for the binary. The server answers
    /// `/decide` for the edge layer, `/admin/blocked-countries` for
    /// operators, and `/status` for monitoring. On SIGINT/SIGTERM the
    /// dispatch worker is drained before returning so queued visit
    /// notifications are not lost.
    ///
    /// # Errors
    ///
    /// Returns an error when pipeline construction fails or the listener
    /// cannot bind.
    pub async fn run_server(config: Config) -> Result<()> {
        let pipeline = build_pipeline(&config).await?;

        let state = AdminState {
            blocklist: Arc::clone(&pipeline.blocklist),
            gate: Arc::clone(&pipeline.gate),
            home_gate: Arc::clone(&pipeline.home_gate),
            tracker: Arc::clone(&pipeline.tracker),
            stats: Arc::clone(&pipeline.stats),
            start_time: Arc::new(Instant::now()),
        };

        let result = tokio::select! {
            served = start_admin_server(&config.bind_addr, config.port, state) => served,
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        // Drain queued visit notifications before exit.
        pipeline.tracker.close().await;
        result
    }

    async fn shutdown_signal() {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    log::warn!("Failed to install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
    }
}
