//! Shared test helpers for storage module tests.
//!
//! This module provides common utilities for database setup and test data creation
//! used across storage module tests.

#[cfg(test)]
use sqlx::SqlitePool;

#[cfg(test)]
use crate::storage::run_migrations;

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution.
#[cfg(test)]
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Inserts a blocked-country row directly, bypassing the query layer.
/// Useful for tests that need a fixture without exercising upsert itself.
#[cfg(test)]
pub async fn seed_blocked_country(
    pool: &SqlitePool,
    code: &str,
    name: &str,
    expires_at: Option<i64>,
    now_ms: i64,
) {
    sqlx::query(
        "INSERT INTO blocked_countries (country_code, country_name, expires_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(code)
    .bind(name)
    .bind(expires_at)
    .bind(now_ms)
    .bind(now_ms)
    .execute(pool)
    .await
    .expect("Failed to seed blocked country");
}
