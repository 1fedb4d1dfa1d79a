//! Gate statistics tracking.
//!
//! This module provides thread-safe statistics tracking for verdicts,
//! errors, warnings, and informational metrics across the decision pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{ErrorType, InfoType, WarningType};

/// Thread-safe gate statistics tracker.
///
/// Tracks verdict counts plus errors, warnings, and informational metrics
/// using atomic counters, allowing concurrent access from request tasks and
/// the dispatch worker. All counters are initialized to zero on creation.
///
/// # Categories
///
/// - **Errors**: upstream failures (geo lookup, blocklist store, webhook)
/// - **Warnings**: fail-open fallbacks actually taken
/// - **Info**: notable decisions (VPN bypass, cache hits, dedup suppression)
///
/// # Thread Safety
///
/// This struct is thread-safe and is shared across tasks using `Arc`.
pub struct GateStats {
    errors: HashMap<ErrorType, AtomicUsize>,
    warnings: HashMap<WarningType, AtomicUsize>,
    info: HashMap<InfoType, AtomicUsize>,
    allowed: AtomicUsize,
    redirected: AtomicUsize,
}

impl GateStats {
    /// Creates a tracker with every counter initialized to zero.
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }

        let mut warnings = HashMap::new();
        for warning in WarningType::iter() {
            warnings.insert(warning, AtomicUsize::new(0));
        }

        let mut info = HashMap::new();
        for info_type in InfoType::iter() {
            info.insert(info_type, AtomicUsize::new(0));
        }

        GateStats {
            errors,
            warnings,
            info,
            allowed: AtomicUsize::new(0),
            redirected: AtomicUsize::new(0),
        }
    }

    /// Increment an error counter.
    pub fn increment_error(&self, error: ErrorType) {
        if let Some(counter) = self.errors.get(&error) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment error counter for {:?} which is not in the map. \
                 This indicates a bug in GateStats initialization.",
                error
            );
        }
    }

    /// Increment a warning counter.
    pub fn increment_warning(&self, warning: WarningType) {
        if let Some(counter) = self.warnings.get(&warning) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment warning counter for {:?} which is not in the map. \
                 This indicates a bug in GateStats initialization.",
                warning
            );
        }
    }

    /// Increment an info counter.
    pub fn increment_info(&self, info_type: InfoType) {
        if let Some(counter) = self.info.get(&info_type) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment info counter for {:?} which is not in the map. \
                 This indicates a bug in GateStats initialization.",
                info_type
            );
        }
    }

    /// Record an allow verdict.
    pub fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a redirect verdict.
    pub fn record_redirected(&self) {
        self.redirected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the count for an error type.
    pub fn get_error_count(&self, error: ErrorType) -> usize {
        self.errors
            .get(&error)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get the count for a warning type.
    pub fn get_warning_count(&self, warning: WarningType) -> usize {
        self.warnings
            .get(&warning)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get the count for an info type.
    pub fn get_info_count(&self, info_type: InfoType) -> usize {
        self.info
            .get(&info_type)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of allow verdicts issued.
    pub fn allowed_count(&self) -> usize {
        self.allowed.load(Ordering::SeqCst)
    }

    /// Number of redirect verdicts issued.
    pub fn redirected_count(&self) -> usize {
        self.redirected.load(Ordering::SeqCst)
    }

    /// Total number of decisions made.
    pub fn total_decisions(&self) -> usize {
        self.allowed_count() + self.redirected_count()
    }

    /// Get total error count across all error types.
    pub fn total_errors(&self) -> usize {
        ErrorType::iter().map(|e| self.get_error_count(e)).sum()
    }

    /// Get total warning count across all warning types.
    pub fn total_warnings(&self) -> usize {
        WarningType::iter().map(|w| self.get_warning_count(w)).sum()
    }

    /// Get total info count across all info types.
    pub fn total_info(&self) -> usize {
        InfoType::iter().map(|i| self.get_info_count(i)).sum()
    }

    /// Non-zero error counters as (label, count) pairs, for reporting.
    pub fn error_breakdown(&self) -> Vec<(&'static str, usize)> {
        ErrorType::iter()
            .map(|e| (e.as_str(), self.get_error_count(e)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Non-zero warning counters as (label, count) pairs, for reporting.
    pub fn warning_breakdown(&self) -> Vec<(&'static str, usize)> {
        WarningType::iter()
            .map(|w| (w.as_str(), self.get_warning_count(w)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Non-zero info counters as (label, count) pairs, for reporting.
    pub fn info_breakdown(&self) -> Vec<(&'static str, usize)> {
        InfoType::iter()
            .map(|i| (i.as_str(), self.get_info_count(i)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

impl Default for GateStats {
    fn default() -> Self {
        Self::new()
    }
}
