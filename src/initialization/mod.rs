//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger (colored plain text or JSON)
//! - HTTP client (geolocation lookups and webhook dispatch)
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
