//! SQLite implementation of the CacheStore port.
//!
//! One row per key. Writes go through a single upsert so value and
//! timestamp always change together.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::domain::errors::CacheResult;
use crate::domain::models::{now_ms, CacheEntry, CacheKey};
use crate::domain::ports::CacheStore;

#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn affected(rows: u64) -> usize {
    usize::try_from(rows).unwrap_or(usize::MAX)
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT value, stored_at_ms FROM cache_entries WHERE cache_key = ?"
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(value, stored_at_ms)| -> CacheResult<CacheEntry> {
            Ok(CacheEntry::with_timestamp(serde_json::from_str(&value)?, stored_at_ms))
        })
        .transpose()
    }

    async fn get_timestamp(&self, key: &CacheKey) -> CacheResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT stored_at_ms FROM cache_entries WHERE cache_key = ?"
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(ts,)| ts))
    }

    async fn set(&self, key: &CacheKey, value: Value) -> CacheResult<()> {
        let value_json = serde_json::to_string(&value)?;

        sqlx::query(
            r#"INSERT INTO cache_entries (cache_key, collection, value, stored_at_ms)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(cache_key) DO UPDATE SET
                   value = excluded.value,
                   stored_at_ms = excluded.stored_at_ms"#
        )
        .bind(key.as_str())
        .bind(key.collection())
        .bind(&value_json)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_collection(&self, collection: &str) -> CacheResult<usize> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;

        Ok(affected(result.rows_affected()))
    }

    async fn clear_all(&self) -> CacheResult<usize> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;

        Ok(affected(result.rows_affected()))
    }

    async fn len(&self) -> CacheResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
