//! In-memory implementation of the CacheStore port.
//!
//! Entries live in a `HashMap` behind a tokio `RwLock`. Each entry is a single
//! map value, so a write replaces value and timestamp together and readers
//! only ever observe whole entries.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::CacheResult;
use crate::domain::models::{CacheEntry, CacheKey};
use crate::domain::ports::CacheStore;

#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently cached, in no particular order.
    pub async fn keys(&self) -> Vec<CacheKey> {
        self.entries.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn get_timestamp(&self, key: &CacheKey) -> CacheResult<Option<i64>> {
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.stored_at_ms))
    }

    async fn set(&self, key: &CacheKey, value: Value) -> CacheResult<()> {
        let entry = CacheEntry::new(value);
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_by_collection(&self, collection: &str) -> CacheResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.belongs_to(collection));
        Ok(before - entries.len())
    }

    async fn clear_all(&self) -> CacheResult<usize> {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.read().await.len())
    }
}
