//! HTTP surface for administration and edge integration.
//!
//! Provides three groups of endpoints:
//! - `/admin/blocked-countries` - blocklist CRUD (GET/POST/PATCH/DELETE)
//! - `/decide` - the per-request gating decision, called by the edge layer
//! - `/status` - JSON counters for monitoring
//!
//! No authentication layer: the server binds localhost by default and is
//! meant to sit behind the deployment's own access control.

mod handlers;
mod types;

use axum::routing::{get, post};
use axum::Router;

use handlers::{decide, list_blocked, remove_blocked, set_blocked, status, update_expiration};
pub use types::AdminState;

/// Assembles the admin router over the given state.
///
/// Split from [`start_admin_server`] so tests can drive the router against
/// an ephemeral listener.
pub fn build_router(state: AdminState) -> Router {
    Router::new()
        .route(
            "/admin/blocked-countries",
            get(list_blocked)
                .post(set_blocked)
                .patch(update_expiration)
                .delete(remove_blocked),
        )
        .route("/decide", post(decide))
        .route("/status", get(status))
        .with_state(state)
}

/// Creates and starts the admin server
pub async fn start_admin_server(
    bind_addr: &str,
    port: u16,
    state: AdminState,
) -> Result<(), anyhow::Error> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind_addr}:{port}"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind admin server to port {}: {}", port, e))?;

    log::info!("Admin server listening on http://{bind_addr}:{port}/");
    log::info!("  - Blocklist: http://{bind_addr}:{port}/admin/blocked-countries");
    log::info!("  - Decisions: http://{bind_addr}:{port}/decide");
    log::info!("  - Status: http://{bind_addr}:{port}/status");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Admin server error: {}", e))?;

    Ok(())
}
