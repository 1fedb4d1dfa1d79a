//! Error type definitions.
//!
//! This module defines all error, warning, and info types used throughout the
//! gating pipeline.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// A configured endpoint URL failed to parse.
    #[error("Endpoint configuration error: {0}")]
    EndpointError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Error types for blocklist administration.
///
/// Only administrative mutations surface these; the decision path swallows
/// all store failures and falls open instead.
#[derive(Error, Debug)]
pub enum BlocklistError {
    /// A country code was not a two-letter string.
    #[error("Invalid country code: {0:?}")]
    InvalidCountryCode(String),

    /// A batch mutation contained no usable country codes.
    #[error("No valid country codes provided")]
    NoValidCodes,

    /// The targeted country has no blocklist entry.
    #[error("Country {0} is not in the blocked list")]
    NotFound(String),

    /// The backing store rejected or failed the operation.
    #[error("Blocklist store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Types of errors that can occur while deciding a request.
///
/// This enum categorizes actual upstream failures. None of them surface to
/// the request path; they are counted here and the decision falls open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// Geolocation lookup exceeded its per-call timeout.
    GeoLookupTimeout,
    /// Geolocation endpoint was unreachable.
    GeoLookupConnectError,
    /// Geolocation endpoint answered with a non-success HTTP status.
    GeoLookupStatusError,
    /// Geolocation request failed for another reqwest-level reason.
    GeoLookupRequestError,
    /// Geolocation response body was not the expected JSON.
    GeoLookupDecodeError,
    /// Blocklist refresh query exceeded its timeout.
    BlocklistQueryTimeout,
    /// Blocklist refresh query failed outright.
    BlocklistQueryError,
    /// Webhook delivery of a visit notification failed.
    NotificationDispatchError,
    /// Visit notification dropped because the dispatch queue was full.
    NotificationQueueFull,
}

/// Types of degraded-but-working conditions.
///
/// Warnings mark the fail-open fallbacks actually taken: the request was
/// still decided, just with weaker inputs than intended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    /// Refresh failed; the previous snapshot was served past its TTL.
    BlocklistServedStale,
    /// Refresh failed with no snapshot at all; served an empty set.
    BlocklistFailOpenEmpty,
    /// Geo upstream answered but had no data for the address.
    GeoLookupNoData,
    /// A tracked-surface request arrived without a client identifier.
    MissingClientId,
}

/// Types of informational metrics recorded while deciding requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// Internal platform traffic short-circuited past the gate.
    InfraExempted,
    /// Visitor from a blocked country allowed through on the VPN rule.
    VpnBypassAllowed,
    /// Edge country hint won over the resolver's answer.
    EdgeHintPreferred,
    /// Blocklist served from a fresh snapshot.
    BlocklistCacheHit,
    /// Blocklist snapshot refreshed from the store.
    BlocklistRefreshed,
    /// Visit by an already-tracked client suppressed.
    DuplicateVisitorSuppressed,
    /// Visit notification delivered to the webhook.
    VisitNotificationSent,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    /// Returns a human-readable string representation of the error type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::GeoLookupTimeout => "Geo lookup timeout",
            ErrorType::GeoLookupConnectError => "Geo lookup connect error",
            ErrorType::GeoLookupStatusError => "Geo lookup status error",
            ErrorType::GeoLookupRequestError => "Geo lookup request error",
            ErrorType::GeoLookupDecodeError => "Geo lookup decode error",
            ErrorType::BlocklistQueryTimeout => "Blocklist query timeout",
            ErrorType::BlocklistQueryError => "Blocklist query error",
            ErrorType::NotificationDispatchError => "Notification dispatch error",
            ErrorType::NotificationQueueFull => "Notification queue full",
        }
    }
}

impl WarningType {
    /// Returns a human-readable string representation of the warning type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::BlocklistServedStale => "Blocklist served stale",
            WarningType::BlocklistFailOpenEmpty => "Blocklist empty fail-open",
            WarningType::GeoLookupNoData => "Geo lookup returned no data",
            WarningType::MissingClientId => "Missing client id",
        }
    }
}

impl InfoType {
    /// Returns a human-readable string representation of the info type.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::InfraExempted => "Internal infrastructure exempted",
            InfoType::VpnBypassAllowed => "VPN bypass allowed",
            InfoType::EdgeHintPreferred => "Edge country hint preferred",
            InfoType::BlocklistCacheHit => "Blocklist cache hit",
            InfoType::BlocklistRefreshed => "Blocklist refreshed",
            InfoType::DuplicateVisitorSuppressed => "Duplicate visitor suppressed",
            InfoType::VisitNotificationSent => "Visit notification sent",
        }
    }
}
