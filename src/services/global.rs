//! Process-wide cache instance.
//!
//! Applications wire one [`CacheService`] up at start with [`install`] and
//! call the free functions below from anywhere. Until a service is installed
//! the functions behave as if caching were disabled: `with_cache` fetches
//! directly and the clear functions remove nothing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use super::cache_service::CacheService;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::{CacheOptions, CacheResponse};

static GLOBAL_CACHE: OnceLock<Arc<CacheService>> = OnceLock::new();

/// Install the process-wide cache. Can only succeed once; a second call
/// hands the rejected service back.
pub fn install(service: Arc<CacheService>) -> Result<(), Arc<CacheService>> {
    GLOBAL_CACHE.set(service)
}

/// The installed cache, if any.
pub fn get() -> Option<Arc<CacheService>> {
    GLOBAL_CACHE.get().cloned()
}

/// [`CacheService::with_cache`] on the installed cache.
pub async fn with_cache<T, F, Fut>(fetch: F, options: CacheOptions<T>) -> CacheResult<CacheResponse<T>>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    match GLOBAL_CACHE.get() {
        Some(service) => service.with_cache(fetch, options).await,
        None => {
            tracing::debug!(collection = %options.collection, "no global cache installed; fetching directly");
            let data = fetch().await.map_err(CacheError::FetchFailed)?;
            Ok(CacheResponse::fresh(data))
        }
    }
}

/// Remove every entry of `collection` from the installed cache.
pub async fn clear_collection_cache(collection: &str) -> usize {
    match GLOBAL_CACHE.get() {
        Some(service) => service.admin().clear_collection(collection).await,
        None => 0,
    }
}

/// Remove every entry from the installed cache.
pub async fn clear_all_cache() -> usize {
    match GLOBAL_CACHE.get() {
        Some(service) => service.admin().clear_all().await,
        None => 0,
    }
}
