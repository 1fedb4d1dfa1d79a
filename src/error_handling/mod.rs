//! Error handling and gate statistics.
//!
//! This module provides:
//! - Error type definitions and categorization
//! - Gate statistics tracking (verdicts, errors, warnings, info metrics)
//!
//! Counter types are categorized into:
//! - **Errors**: upstream failures that the pipeline swallowed
//! - **Warnings**: fail-open fallbacks actually taken
//! - **Info**: notable decisions (VPN bypass, cache hits, dedup suppression)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_geo_error, record_geo_error};
pub use stats::GateStats;
pub use types::{
    BlocklistError, DatabaseError, ErrorType, InfoType, InitializationError, WarningType,
};
