//! Blocked-country database operations.
//!
//! This module provides the query layer over the `blocked_countries` table:
//! - Listing entries (all, or only currently active ones)
//! - Upserting single codes and replacing the whole set
//! - Expiration updates and removals
//!
//! Expiry is evaluated in SQL against a caller-supplied clock so tests can
//! pin time. All queries use parameterized binds to prevent SQL injection.

use sqlx::SqlitePool;

use crate::countries;

use super::models::BlockedCountry;

const SELECT_COLUMNS: &str =
    "id, country_code, country_name, expires_at, created_at, updated_at";

/// Lists every blocked-country entry, including expired ones, ordered by
/// country name.
///
/// The admin surface shows expired entries so operators can see what lapsed;
/// traffic decisions use [`active_codes`] instead.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<BlockedCountry>, sqlx::Error> {
    sqlx::query_as::<_, BlockedCountry>(&format!(
        "SELECT {SELECT_COLUMNS} FROM blocked_countries ORDER BY country_name ASC"
    ))
    .fetch_all(pool)
    .await
}

/// Lists the entries that are active at `now_ms`, ordered by country name.
pub async fn list_active(
    pool: &SqlitePool,
    now_ms: i64,
) -> Result<Vec<BlockedCountry>, sqlx::Error> {
    sqlx::query_as::<_, BlockedCountry>(&format!(
        "SELECT {SELECT_COLUMNS} FROM blocked_countries \
         WHERE expires_at IS NULL OR expires_at > ? \
         ORDER BY country_name ASC"
    ))
    .bind(now_ms)
    .fetch_all(pool)
    .await
}

/// Returns the upper-cased codes of all entries active at `now_ms`.
///
/// This is the set the request gate matches against.
pub async fn active_codes(pool: &SqlitePool, now_ms: i64) -> Result<Vec<String>, sqlx::Error> {
    let codes: Vec<String> = sqlx::query_scalar(
        "SELECT country_code FROM blocked_countries WHERE expires_at IS NULL OR expires_at > ?",
    )
    .bind(now_ms)
    .fetch_all(pool)
    .await?;
    Ok(codes.into_iter().map(|c| c.to_ascii_uppercase()).collect())
}

/// Fetches a single entry by country code, expired or not.
pub async fn get(pool: &SqlitePool, code: &str) -> Result<Option<BlockedCountry>, sqlx::Error> {
    sqlx::query_as::<_, BlockedCountry>(&format!(
        "SELECT {SELECT_COLUMNS} FROM blocked_countries WHERE country_code = ?"
    ))
    .bind(code.to_ascii_uppercase())
    .fetch_optional(pool)
    .await
}

/// Inserts a blocked country, or updates its expiration if the code already
/// exists. Returns the stored entry.
///
/// The display name is denormalized from the country directory at write time,
/// so renames in the directory only take effect on the next write.
pub async fn upsert(
    pool: &SqlitePool,
    code: &str,
    expires_at: Option<i64>,
    now_ms: i64,
) -> Result<BlockedCountry, sqlx::Error> {
    let code = code.trim().to_ascii_uppercase();
    let name = countries::country_name(&code);
    sqlx::query(
        "INSERT INTO blocked_countries (country_code, country_name, expires_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(country_code) DO UPDATE SET \
             country_name = excluded.country_name, \
             expires_at = excluded.expires_at, \
             updated_at = excluded.updated_at",
    )
    .bind(&code)
    .bind(&name)
    .bind(expires_at)
    .bind(now_ms)
    .bind(now_ms)
    .execute(pool)
    .await?;
    get(pool, &code).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Updates the expiration of an existing entry.
///
/// Returns the updated entry, or `None` when no entry exists for the code.
pub async fn update_expiration(
    pool: &SqlitePool,
    code: &str,
    expires_at: Option<i64>,
    now_ms: i64,
) -> Result<Option<BlockedCountry>, sqlx::Error> {
    let code = code.trim().to_ascii_uppercase();
    let result =
        sqlx::query("UPDATE blocked_countries SET expires_at = ?, updated_at = ? WHERE country_code = ?")
            .bind(expires_at)
            .bind(now_ms)
            .bind(&code)
            .execute(pool)
            .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, &code).await
}

/// Removes an entry by code. Returns `true` when a row was deleted.
pub async fn remove(pool: &SqlitePool, code: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM blocked_countries WHERE country_code = ?")
        .bind(code.trim().to_ascii_uppercase())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes several entries at once. Returns the number of rows deleted.
pub async fn remove_many(pool: &SqlitePool, codes: &[String]) -> Result<u64, sqlx::Error> {
    if codes.is_empty() {
        return Ok(0);
    }
    let mut builder =
        sqlx::QueryBuilder::new("DELETE FROM blocked_countries WHERE country_code IN (");
    let mut separated = builder.separated(", ");
    for code in codes {
        separated.push_bind(code.trim().to_ascii_uppercase());
    }
    separated.push_unseparated(")");
    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Replaces the active blocked set with `codes`.
///
/// Active entries absent from `codes` are removed, new codes are inserted,
/// and codes present in both get the new expiration. Expired entries that are
/// not re-blocked are left in place; they are already inactive.
pub async fn set_blocked(
    pool: &SqlitePool,
    codes: &[String],
    expires_at: Option<i64>,
    now_ms: i64,
) -> Result<(), sqlx::Error> {
    let target: Vec<String> = codes
        .iter()
        .map(|c| c.trim().to_ascii_uppercase())
        .collect();

    let current = active_codes(pool, now_ms).await?;
    let to_remove: Vec<String> = current
        .into_iter()
        .filter(|code| !target.contains(code))
        .collect();
    remove_many(pool, &to_remove).await?;

    for code in &target {
        upsert(pool, code, expires_at, now_ms).await?;
    }
    Ok(())
}

/// Whether an active entry exists for the code at `now_ms`.
pub async fn is_blocked(pool: &SqlitePool, code: &str, now_ms: i64) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM blocked_countries \
         WHERE country_code = ? AND (expires_at IS NULL OR expires_at > ?)",
    )
    .bind(code.trim().to_ascii_uppercase())
    .bind(now_ms)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Deletes rows whose expiration has passed. Returns the number removed.
///
/// Housekeeping only; correctness never depends on it because expiry is
/// filtered at query time.
pub async fn cleanup_expired(pool: &SqlitePool, now_ms: i64) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM blocked_countries WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now_ms)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
