//! Cache bootstrap
//!
//! Turns a loaded [`Config`] into a ready [`CacheService`]:
//! - picks the storage backend
//! - opens and migrates the SQLite file when that backend is selected
//! - applies the global enabled flag

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::memory::InMemoryCacheStore;
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteCacheStore};
use crate::domain::models::config::{CacheConfig, Config, StoreBackend};
use crate::domain::ports::CacheStore;
use crate::infrastructure::config::ConfigLoader;
use crate::services::CacheService;

/// Build the store selected by `config.backend`.
pub async fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryCacheStore::new())),
        StoreBackend::Sqlite => {
            let url = format!("sqlite:{}", config.sqlite_path);
            let pool = initialize_database(&url, Some(PoolConfig::from(config)))
                .await
                .with_context(|| format!("Failed to open cache database at {}", config.sqlite_path))?;
            Ok(Arc::new(SqliteCacheStore::new(pool)))
        }
    }
}

/// Build a cache service from a validated configuration.
pub async fn build_cache_service(config: &Config) -> Result<CacheService> {
    ConfigLoader::validate(config)?;
    let store = build_store(&config.cache).await?;

    tracing::info!(
        backend = ?config.cache.backend,
        enabled = config.cache.enabled,
        "cache service ready"
    );

    Ok(CacheService::with_config(store, &config.cache))
}
