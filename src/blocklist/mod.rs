//! Cached view of the blocked-country set.
//!
//! Every gated request consults the blocklist, so reads go through an
//! in-memory snapshot refreshed from the database at most once per TTL:
//! - Fresh snapshot: served without touching the database
//! - Expired snapshot: one task refreshes while concurrent callers wait on
//!   the same refresh (single flight), then everyone sees the new set
//! - Refresh failure: the stale snapshot keeps being served; with no
//!   snapshot at all the cache serves an empty set (fail open)
//!
//! Admin mutations write straight to the database and drop the snapshot so
//! the next read observes the change immediately.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};

use crate::error_handling::{BlocklistError, ErrorType, GateStats, InfoType, WarningType};
use crate::storage::models::now_millis;
use crate::storage::{blocked, BlockDuration, BlockedCountry};

/// One materialized read of the active blocklist.
struct Snapshot {
    codes: Arc<HashSet<String>>,
    fetched_at: Instant,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// TTL-cached blocklist reads plus write-through admin mutations.
///
/// Cheap to share: wrap in an [`Arc`] and hand clones to the gate and the
/// admin surface.
pub struct BlocklistCache {
    pool: Arc<SqlitePool>,
    ttl: Duration,
    query_timeout: Duration,
    snapshot: RwLock<Option<Snapshot>>,
    refresh_lock: Mutex<()>,
    stats: Arc<GateStats>,
}

impl BlocklistCache {
    /// Creates a cache over the given pool.
    ///
    /// `ttl` bounds how stale a served snapshot may be under normal
    /// operation; `query_timeout` bounds a single refresh query so a slow
    /// database cannot stall request handling.
    pub fn new(
        pool: Arc<SqlitePool>,
        ttl: Duration,
        query_timeout: Duration,
        stats: Arc<GateStats>,
    ) -> Self {
        BlocklistCache {
            pool,
            ttl,
            query_timeout,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            stats,
        }
    }

    /// Returns the set of currently blocked country codes, upper-cased.
    ///
    /// Never fails: database trouble degrades to the stale snapshot, or to
    /// an empty set when nothing was ever fetched.
    pub async fn active_codes(&self) -> Arc<HashSet<String>> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.is_fresh(self.ttl) {
                    self.stats.increment_info(InfoType::BlocklistCacheHit);
                    return Arc::clone(&snapshot.codes);
                }
            }
        }

        // Single flight: one refresher, everyone else waits and re-checks.
        let _refresh_guard = self.refresh_lock.lock().await;
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.is_fresh(self.ttl) {
                    self.stats.increment_info(InfoType::BlocklistCacheHit);
                    return Arc::clone(&snapshot.codes);
                }
            }
        }

        match self.fetch_codes().await {
            Some(codes) => {
                let codes = Arc::new(codes);
                let mut guard = self.snapshot.write().await;
                *guard = Some(Snapshot {
                    codes: Arc::clone(&codes),
                    fetched_at: Instant::now(),
                });
                self.stats.increment_info(InfoType::BlocklistRefreshed);
                debug!("Blocklist snapshot refreshed ({} active codes)", codes.len());
                codes
            }
            None => {
                let guard = self.snapshot.read().await;
                match guard.as_ref() {
                    Some(snapshot) => {
                        self.stats
                            .increment_warning(WarningType::BlocklistServedStale);
                        warn!(
                            "Blocklist refresh failed; serving stale snapshot ({} codes)",
                            snapshot.codes.len()
                        );
                        Arc::clone(&snapshot.codes)
                    }
                    None => {
                        self.stats
                            .increment_warning(WarningType::BlocklistFailOpenEmpty);
                        warn!("Blocklist unavailable with no snapshot; failing open with empty set");
                        Arc::new(HashSet::new())
                    }
                }
            }
        }
    }

    /// Runs the refresh query under its timeout. `None` covers both query
    /// errors and the timeout firing.
    async fn fetch_codes(&self) -> Option<HashSet<String>> {
        let query = blocked::active_codes(&self.pool, now_millis());
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(Ok(codes)) => Some(codes.into_iter().collect()),
            Ok(Err(e)) => {
                self.stats.increment_error(ErrorType::BlocklistQueryError);
                error!("Blocklist query failed: {e}");
                None
            }
            Err(_) => {
                self.stats
                    .increment_error(ErrorType::BlocklistQueryTimeout);
                error!(
                    "Blocklist query exceeded {}ms timeout",
                    self.query_timeout.as_millis()
                );
                None
            }
        }
    }

    /// Drops the current snapshot so the next read refetches.
    pub async fn invalidate(&self) {
        let mut guard = self.snapshot.write().await;
        *guard = None;
        debug!("Blocklist snapshot invalidated");
    }

    /// Age of the current snapshot in seconds, if one exists.
    pub async fn snapshot_age_secs(&self) -> Option<u64> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .map(|snapshot| snapshot.fetched_at.elapsed().as_secs())
    }

    /// Lists every blocklist entry, including expired ones, straight from
    /// the database. Admin reads skip the snapshot so operators always see
    /// current rows.
    pub async fn list_all(&self) -> Result<Vec<BlockedCountry>, BlocklistError> {
        Ok(blocked::list_all(&self.pool).await?)
    }

    /// Replaces the blocked set with `codes`, each blocked for `duration`.
    ///
    /// Codes are trimmed and upper-cased; entries that are not two
    /// characters long are discarded. Errors with
    /// [`BlocklistError::NoValidCodes`] when nothing usable remains.
    /// Returns the full listing after the write.
    pub async fn set_blocked(
        &self,
        codes: &[String],
        duration: BlockDuration,
    ) -> Result<Vec<BlockedCountry>, BlocklistError> {
        let valid: Vec<String> = codes
            .iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| c.len() == 2)
            .collect();
        if valid.is_empty() {
            return Err(BlocklistError::NoValidCodes);
        }

        let now = now_millis();
        blocked::set_blocked(&self.pool, &valid, duration.expires_at_from(now), now).await?;
        self.invalidate().await;
        Ok(blocked::list_all(&self.pool).await?)
    }

    /// Changes the expiration of a single blocked country.
    pub async fn update_expiration(
        &self,
        code: &str,
        duration: BlockDuration,
    ) -> Result<BlockedCountry, BlocklistError> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.len() != 2 {
            return Err(BlocklistError::InvalidCountryCode(code.to_string()));
        }

        let now = now_millis();
        let updated =
            blocked::update_expiration(&self.pool, &normalized, duration.expires_at_from(now), now)
                .await?;
        match updated {
            Some(entry) => {
                self.invalidate().await;
                Ok(entry)
            }
            None => Err(BlocklistError::NotFound(normalized)),
        }
    }

    /// Removes a single blocked country.
    pub async fn remove(&self, code: &str) -> Result<(), BlocklistError> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.len() != 2 {
            return Err(BlocklistError::InvalidCountryCode(code.to_string()));
        }

        if blocked::remove(&self.pool, &normalized).await? {
            self.invalidate().await;
            Ok(())
        } else {
            Err(BlocklistError::NotFound(normalized))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{create_test_pool, seed_blocked_country};

    fn test_cache(pool: SqlitePool, ttl: Duration) -> (BlocklistCache, Arc<GateStats>) {
        let stats = Arc::new(GateStats::new());
        let cache = BlocklistCache::new(
            Arc::new(pool),
            ttl,
            Duration::from_millis(400),
            Arc::clone(&stats),
        );
        (cache, stats)
    }

    #[tokio::test]
    async fn test_cold_start_refreshes_once() {
        let pool = create_test_pool().await;
        seed_blocked_country(&pool, "RU", "Russia", None, 0).await;
        let (cache, stats) = test_cache(pool, Duration::from_secs(300));

        let codes = cache.active_codes().await;
        assert!(codes.contains("RU"));
        assert_eq!(stats.get_info_count(InfoType::BlocklistRefreshed), 1);

        // Second read inside the TTL is a pure cache hit.
        let again = cache.active_codes().await;
        assert!(again.contains("RU"));
        assert_eq!(stats.get_info_count(InfoType::BlocklistRefreshed), 1);
        assert_eq!(stats.get_info_count(InfoType::BlocklistCacheHit), 1);
    }

    #[tokio::test]
    async fn test_fail_open_with_no_snapshot() {
        let pool = create_test_pool().await;
        pool.close().await;
        let (cache, stats) = test_cache(pool, Duration::from_secs(300));

        let codes = cache.active_codes().await;
        assert!(codes.is_empty());
        assert_eq!(
            stats.get_warning_count(WarningType::BlocklistFailOpenEmpty),
            1
        );
        assert_eq!(stats.get_error_count(ErrorType::BlocklistQueryError), 1);
    }

    #[tokio::test]
    async fn test_serves_stale_snapshot_on_refresh_failure() {
        let pool = create_test_pool().await;
        seed_blocked_country(&pool, "CN", "China", None, 0).await;
        // Zero TTL forces a refresh attempt on every read.
        let (cache, stats) = test_cache(pool.clone(), Duration::ZERO);

        let codes = cache.active_codes().await;
        assert!(codes.contains("CN"));

        pool.close().await;
        let stale = cache.active_codes().await;
        assert!(stale.contains("CN"));
        assert_eq!(
            stats.get_warning_count(WarningType::BlocklistServedStale),
            1
        );
    }

    #[tokio::test]
    async fn test_mutation_invalidates_snapshot() {
        let pool = create_test_pool().await;
        let (cache, stats) = test_cache(pool, Duration::from_secs(300));

        assert!(cache.active_codes().await.is_empty());

        cache
            .set_blocked(&["fr".to_string()], BlockDuration::Permanent)
            .await
            .unwrap();

        // Visible immediately, without waiting out the TTL.
        let codes = cache.active_codes().await;
        assert!(codes.contains("FR"));
        assert_eq!(stats.get_info_count(InfoType::BlocklistRefreshed), 2);
    }

    #[tokio::test]
    async fn test_set_blocked_filters_invalid_codes() {
        let pool = create_test_pool().await;
        let (cache, _stats) = test_cache(pool, Duration::from_secs(300));

        let listing = cache
            .set_blocked(
                &["de".to_string(), "FRA".to_string(), "".to_string()],
                BlockDuration::OneDay,
            )
            .await
            .unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].country_code, "DE");

        let err = cache
            .set_blocked(&["FRA".to_string()], BlockDuration::OneDay)
            .await
            .unwrap_err();
        assert!(matches!(err, BlocklistError::NoValidCodes));
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_code() {
        let pool = create_test_pool().await;
        let (cache, _stats) = test_cache(pool, Duration::from_secs(300));

        let err = cache
            .update_expiration("FR", BlockDuration::OneHour)
            .await
            .unwrap_err();
        assert!(matches!(err, BlocklistError::NotFound(_)));

        let err = cache.remove("FR").await.unwrap_err();
        assert!(matches!(err, BlocklistError::NotFound(_)));

        let err = cache.remove("FRANCE").await.unwrap_err();
        assert!(matches!(err, BlocklistError::InvalidCountryCode(_)));
    }
}
