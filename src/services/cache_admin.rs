//! Invalidation entry points for UI-triggered refresh actions.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::CacheKey;
use crate::domain::ports::CacheStore;

/// Clears cached entries. Every operation is idempotent and a no-op when
/// nothing matches; store failures are logged and reported as nothing removed.
#[derive(Clone)]
pub struct CacheAdmin {
    store: Arc<dyn CacheStore>,
}

impl CacheAdmin {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Remove every entry of one collection, e.g. when the user forces a
    /// refresh of a single entity type.
    pub async fn clear_collection(&self, collection: &str) -> usize {
        match self.store.delete_by_collection(collection).await {
            Ok(removed) => {
                info!(collection, removed, "cleared collection cache");
                removed
            }
            Err(err) => {
                warn!(collection, error = %err, "failed to clear collection cache");
                0
            }
        }
    }

    /// Remove every entry.
    pub async fn clear_all(&self) -> usize {
        match self.store.clear_all().await {
            Ok(removed) => {
                info!(removed, "cleared all cache entries");
                removed
            }
            Err(err) => {
                warn!(error = %err, "failed to clear cache");
                0
            }
        }
    }

    /// Remove a single entry. Returns whether one was removed.
    pub async fn invalidate_key(&self, key: &CacheKey) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => {
                info!(key = %key, removed, "invalidated cache entry");
                removed
            }
            Err(err) => {
                warn!(key = %key, error = %err, "failed to invalidate cache entry");
                false
            }
        }
    }
}
