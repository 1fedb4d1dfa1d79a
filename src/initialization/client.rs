//! HTTP client initialization.
//!
//! This module provides functions to initialize the shared HTTP client used
//! for geolocation lookups and webhook dispatch.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use reqwest::ClientBuilder;

/// Initializes the shared HTTP client.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the configuration
/// - Overall request timeout from the configuration
/// - Rustls TLS backend (no native TLS)
///
/// The geolocation lookup applies its own tighter per-call timeout on top of
/// this; the client-level timeout is the outer bound for webhook posts.
///
/// # Arguments
///
/// * `config` - Service configuration containing user-agent and timeout settings
///
/// # Returns
///
/// A configured HTTP client ready for making requests.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub async fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(Arc::new(client))
}
