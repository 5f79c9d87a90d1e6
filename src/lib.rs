//! Revalidate - stale-while-revalidate request cache
//!
//! Revalidate sits between a UI and a remote data API. Requests are keyed by
//! their logical identity (collection, operation, record id, query params);
//! a cached result is returned immediately while a fresh copy is fetched in
//! the background, with at most one refresh in flight per key.
//!
//! # Architecture
//!
//! The crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): keys, entries, options, errors and the
//!   `CacheStore` port
//! - **Adapters** (`adapters`): in-memory and SQLite stores
//! - **Service Layer** (`services`): the `with_cache` facade, refresh
//!   coordination and invalidation
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and
//!   bootstrap
//!
//! # Example
//!
//! ```no_run
//! use revalidate::{CacheOptions, CacheService};
//!
//! # async fn fetch_edges() -> anyhow::Result<Vec<String>> { Ok(vec![]) }
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = CacheService::in_memory();
//!
//!     let response = cache
//!         .with_cache(
//!             || fetch_edges(),
//!             CacheOptions::list("edges").on_update(|fresh| println!("{fresh:?}")),
//!         )
//!         .await?;
//!     println!("from cache: {}", response.from_cache);
//!
//!     cache.admin().clear_collection("edges").await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{InMemoryCacheStore, SqliteCacheStore};
pub use domain::errors::{CacheError, CacheResult};
pub use domain::models::{
    CacheConfig, CacheEntry, CacheKey, CacheOptions, CacheResponse, Config, LoggingConfig,
    Operation, Params, StoreBackend, UpdateCallback,
};
pub use domain::ports::CacheStore;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CacheAdmin, CacheService, CacheStats, RefreshCoordinator, RefreshState};
