//! Stale-while-revalidate facade.
//!
//! [`CacheService::with_cache`] is the single entry point callers use to read
//! through the cache:
//! - disabled or `skip_cache`: plain fetch, store untouched
//! - hit: cached data returned at once, refresh started in the background
//! - miss: fetch in the foreground, cache the result, return it
//!
//! There is no expiry. An entry is served for as long as it exists and is
//! refreshed opportunistically on every hit.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::cache_admin::CacheAdmin;
use super::cache_stats::{CacheStats, StatsCounters};
use super::refresh_coordinator::RefreshCoordinator;
use crate::adapters::memory::InMemoryCacheStore;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::{CacheConfig, CacheEntry, CacheKey, CacheOptions, CacheResponse};
use crate::domain::ports::CacheStore;

pub struct CacheService {
    store: Arc<dyn CacheStore>,
    coordinator: RefreshCoordinator,
    admin: CacheAdmin,
    enabled: AtomicBool,
    stats: Arc<StatsCounters>,
}

impl CacheService {
    /// Create an enabled cache over `store`.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        let stats = Arc::new(StatsCounters::default());
        Self {
            coordinator: RefreshCoordinator::with_stats(Arc::clone(&store), Arc::clone(&stats)),
            admin: CacheAdmin::new(Arc::clone(&store)),
            store,
            enabled: AtomicBool::new(true),
            stats,
        }
    }

    /// Create a cache over `store` honouring `config.enabled`.
    pub fn with_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        let service = Self::new(store);
        service.set_enabled(config.enabled);
        service
    }

    /// Enabled cache backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn caching on or off for all subsequent calls. Entries already
    /// stored are kept.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        debug!(enabled, "cache enabled flag changed");
    }

    /// Serve a request through the cache.
    ///
    /// `fetch` is called at most once per call. On a hit it is only called
    /// if no refresh for the key is already running; its future then runs in
    /// a background task and `options.on_update` receives the result. On a
    /// miss or bypass it is awaited here.
    ///
    /// # Errors
    /// - [`CacheError::InvalidKey`] if the options do not form a valid key
    /// - [`CacheError::FetchFailed`] if the fetch fails on a miss or bypass
    ///
    /// Background refresh failures and storage faults never surface here.
    pub async fn with_cache<T, F, Fut>(
        &self,
        fetch: F,
        options: CacheOptions<T>,
    ) -> CacheResult<CacheResponse<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if options.skip_cache || !self.is_enabled() {
            self.stats.bypass();
            debug!(collection = %options.collection, "cache bypassed");
            let data = fetch().await.map_err(CacheError::FetchFailed)?;
            return Ok(CacheResponse::fresh(data));
        }

        let key = options.key()?;

        if let Some((data, timestamp_ms)) = self.lookup::<T>(&key).await {
            self.stats.hit();
            debug!(key = %key, "cache hit; revalidating in background");
            self.coordinator
                .trigger_background_refresh(key, fetch, options.on_update);
            return Ok(CacheResponse::cached(data, timestamp_ms));
        }

        self.stats.miss();
        debug!(key = %key, "cache miss; fetching");
        let data = self.coordinator.fetch_and_populate(&key, fetch()).await?;
        Ok(CacheResponse::fresh(data))
    }

    /// Cached data for `key`, if any, decoded as `T`. Read failures and
    /// entries that no longer decode count as misses.
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<(T, i64)> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(err) => {
                self.stats.storage_failed();
                warn!(key = %key, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        let CacheEntry { value, stored_at_ms } = entry;
        match serde_json::from_value(value) {
            Ok(data) => Some((data, stored_at_ms)),
            Err(err) => {
                warn!(key = %key, error = %err, "cached value does not match requested type; treating as miss");
                None
            }
        }
    }

    /// Drop the entry the given options would be served from.
    pub async fn invalidate<T>(&self, options: &CacheOptions<T>) -> CacheResult<bool> {
        let key = options.key()?;
        Ok(self.admin.invalidate_key(&key).await)
    }

    pub fn admin(&self) -> &CacheAdmin {
        &self.admin
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
