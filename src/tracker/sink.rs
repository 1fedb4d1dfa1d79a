//! Visit notification delivery.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::VisitEvent;

/// Embed accent for an allowed visit (green).
const COLOR_ALLOWED: u32 = 0x57F287;

/// Embed accent for a visit that got redirected to the blocked page (red).
const COLOR_BLOCKED: u32 = 0xED4245;

/// Where visit events go.
///
/// Implementations must be safe to call from the dispatch worker task.
/// Errors are logged and counted by the worker; they are never retried and
/// never reach a request handler.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one event.
    async fn deliver(&self, event: &VisitEvent) -> anyhow::Result<()>;
}

/// POSTs visit events to a Discord-compatible webhook as an embed.
pub struct WebhookSink {
    client: Arc<reqwest::Client>,
    webhook_url: String,
}

impl WebhookSink {
    /// Sink posting to `webhook_url` with the shared HTTP client.
    pub fn new(client: Arc<reqwest::Client>, webhook_url: impl Into<String>) -> Self {
        WebhookSink {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    fn embed_payload(event: &VisitEvent) -> serde_json::Value {
        let unknown = || "Unknown".to_string();
        let country = match (&event.country, &event.country_code) {
            (Some(name), Some(code)) => format!("{name} ({code})"),
            (Some(name), None) => name.clone(),
            (None, Some(code)) => code.clone(),
            (None, None) => unknown(),
        };
        let timestamp = chrono::DateTime::from_timestamp_millis(event.occurred_at_ms)
            .unwrap_or_else(chrono::Utc::now)
            .to_rfc3339();

        let (title, color) = if event.blocked {
            ("🚫 Blocked visitor", COLOR_BLOCKED)
        } else {
            ("🌍 New visitor", COLOR_ALLOWED)
        };

        json!({
            "embeds": [{
                "title": title,
                "color": color,
                "fields": [
                    { "name": "Country", "value": country, "inline": true },
                    { "name": "City", "value": event.city.clone().unwrap_or_else(unknown), "inline": true },
                    { "name": "Region", "value": event.region.clone().unwrap_or_else(unknown), "inline": true },
                    { "name": "Timezone", "value": event.timezone.clone().unwrap_or_else(unknown), "inline": true },
                    { "name": "ISP", "value": event.isp.clone().unwrap_or_else(unknown), "inline": true },
                    { "name": "IP", "value": event.origin.clone().unwrap_or_else(unknown), "inline": true },
                    { "name": "Page", "value": event.path.clone(), "inline": true },
                    { "name": "VPN", "value": if event.is_vpn { "Yes" } else { "No" }, "inline": true },
                ],
                "timestamp": timestamp,
                "footer": { "text": "geogate" }
            }]
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &VisitEvent) -> anyhow::Result<()> {
        let payload = Self::embed_payload(event);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}

/// Sink used when no webhook is configured. Events are dropped after a
/// debug log, which keeps dedup behavior observable in development.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn deliver(&self, event: &VisitEvent) -> anyhow::Result<()> {
        log::debug!("Visit notification (no webhook configured): {}", event.path);
        Ok(())
    }
}
