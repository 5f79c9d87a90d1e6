use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::CacheResult;
use crate::domain::models::{CacheEntry, CacheKey};

/// Storage port for cached request results
///
/// Implementations hold one [`CacheEntry`] per [`CacheKey`] and must keep
/// the (value, timestamp) pair consistent:
/// - `set` replaces both halves in a single write
/// - concurrent writers to one key resolve as last-writer-wins
/// - `get` never returns a value paired with another write's timestamp
///
/// Entries live until explicitly deleted; there is no eviction.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Load the entry for `key`, `None` if nothing is cached
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>>;

    /// Timestamp (epoch ms) of the entry for `key`, `None` if nothing is cached
    async fn get_timestamp(&self, key: &CacheKey) -> CacheResult<Option<i64>> {
        Ok(self.get(key).await?.map(|entry| entry.stored_at_ms))
    }

    /// Store `value` under `key`, stamped with the current time
    ///
    /// # Errors
    /// Returns [`crate::domain::errors::CacheError::StorageFailed`] if the
    /// backend rejects the write.
    async fn set(&self, key: &CacheKey, value: Value) -> CacheResult<()>;

    /// Remove one entry. Returns whether anything was removed.
    async fn delete(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Remove every entry belonging to `collection`. Returns the number removed.
    async fn delete_by_collection(&self, collection: &str) -> CacheResult<usize>;

    /// Remove every entry. Returns the number removed.
    async fn clear_all(&self) -> CacheResult<usize>;

    /// Number of cached entries
    async fn len(&self) -> CacheResult<usize>;

    async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }
}
