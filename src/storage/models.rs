// storage/models.rs
// Database models and types

use serde::{Deserialize, Serialize};

/// Represents one blocked-country entry for database insertion and retrieval.
///
/// Contains the ISO 3166-1 alpha-2 code, the denormalized display name, and
/// the expiration bookkeeping for temporary blocks.
///
/// # Database Schema
///
/// This struct maps directly to the `blocked_countries` table. All timestamp
/// fields are stored as milliseconds since Unix epoch. `expires_at` is `NULL`
/// for permanent blocks. Expired rows are not deleted automatically; expiry
/// is a query-time filter, so a lapsed entry simply stops matching until it
/// is removed or re-blocked.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct BlockedCountry {
    /// Row id.
    pub id: i64,
    /// ISO 3166-1 alpha-2 code, stored upper-cased.
    pub country_code: String,
    /// Display name, denormalized from the country directory at write time.
    pub country_name: String,
    /// Expiry as milliseconds since Unix epoch; `None` for permanent blocks.
    pub expires_at: Option<i64>,
    /// Creation time as milliseconds since Unix epoch.
    pub created_at: i64,
    /// Last modification time as milliseconds since Unix epoch.
    pub updated_at: i64,
}

impl BlockedCountry {
    /// Whether this entry blocks traffic at the given instant.
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.expires_at.map_or(true, |expires| expires > now_ms)
    }
}

/// Preset block durations accepted by the admin surface.
///
/// Serialized as the short tokens the admin API exchanges (`"30s"`, `"1h"`,
/// `"permanent"`, ...), so the wire format and the internal representation
/// stay in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockDuration {
    /// 30 seconds.
    #[serde(rename = "30s")]
    ThirtySeconds,
    /// 1 minute.
    #[serde(rename = "1m")]
    OneMinute,
    /// 5 minutes.
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 1 hour.
    #[serde(rename = "1h")]
    OneHour,
    /// 24 hours.
    #[serde(rename = "24h")]
    OneDay,
    /// 7 days.
    #[serde(rename = "7d")]
    SevenDays,
    /// 14 days.
    #[serde(rename = "14d")]
    FourteenDays,
    /// 30 days.
    #[serde(rename = "30d")]
    ThirtyDays,
    /// 3 months (90 days).
    #[serde(rename = "3month")]
    ThreeMonths,
    /// 6 months (180 days).
    #[serde(rename = "6month")]
    SixMonths,
    /// 1 year (365 days).
    #[serde(rename = "1year")]
    OneYear,
    /// Never expires.
    #[serde(rename = "permanent")]
    Permanent,
}

impl BlockDuration {
    /// Returns the duration in milliseconds, or `None` for a permanent block.
    pub fn as_millis(&self) -> Option<i64> {
        const MINUTE: i64 = 60 * 1000;
        const HOUR: i64 = 60 * MINUTE;
        const DAY: i64 = 24 * HOUR;
        match self {
            BlockDuration::ThirtySeconds => Some(30 * 1000),
            BlockDuration::OneMinute => Some(MINUTE),
            BlockDuration::FiveMinutes => Some(5 * MINUTE),
            BlockDuration::OneHour => Some(HOUR),
            BlockDuration::OneDay => Some(DAY),
            BlockDuration::SevenDays => Some(7 * DAY),
            BlockDuration::FourteenDays => Some(14 * DAY),
            BlockDuration::ThirtyDays => Some(30 * DAY),
            BlockDuration::ThreeMonths => Some(90 * DAY),
            BlockDuration::SixMonths => Some(180 * DAY),
            BlockDuration::OneYear => Some(365 * DAY),
            BlockDuration::Permanent => None,
        }
    }

    /// Computes the absolute `expires_at` timestamp for a block starting now.
    ///
    /// `None` means the block never expires.
    pub fn expires_at_from(&self, now_ms: i64) -> Option<i64> {
        self.as_millis().map(|ms| now_ms + ms)
    }

    /// Returns the wire token for this duration.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockDuration::ThirtySeconds => "30s",
            BlockDuration::OneMinute => "1m",
            BlockDuration::FiveMinutes => "5m",
            BlockDuration::OneHour => "1h",
            BlockDuration::OneDay => "24h",
            BlockDuration::SevenDays => "7d",
            BlockDuration::FourteenDays => "14d",
            BlockDuration::ThirtyDays => "30d",
            BlockDuration::ThreeMonths => "3month",
            BlockDuration::SixMonths => "6month",
            BlockDuration::OneYear => "1year",
            BlockDuration::Permanent => "permanent",
        }
    }
}

/// Current wall-clock time in milliseconds since Unix epoch, matching the
/// representation stored in the `blocked_countries` timestamp columns.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Formats the time remaining on a block for display.
///
/// Returns `"Permanent"` for never-expiring blocks, `"Expired"` once the
/// timestamp has passed, and otherwise the two most significant units of the
/// remainder, e.g. `"3d 7h remaining"` or `"45s remaining"`.
pub fn format_expiration(expires_at: Option<i64>, now_ms: i64) -> String {
    let Some(expires) = expires_at else {
        return "Permanent".to_string();
    };
    let diff = expires - now_ms;
    if diff <= 0 {
        return "Expired".to_string();
    }

    let days = diff / 86_400_000;
    let hours = (diff % 86_400_000) / 3_600_000;
    let minutes = (diff % 3_600_000) / 60_000;
    let seconds = (diff % 60_000) / 1000;

    if days > 0 {
        format!("{days}d {hours}h remaining")
    } else if hours > 0 {
        format!("{hours}h {minutes}m remaining")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s remaining")
    } else {
        format!("{seconds}s remaining")
    }
}
