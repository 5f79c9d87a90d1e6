pub mod cache_entry;
pub mod cache_key;
pub mod cache_options;
pub mod config;

pub use cache_entry::{now_ms, CacheEntry, CacheResponse};
pub use cache_key::{canonical_json, CacheKey, Operation, Params};
pub use cache_options::{CacheOptions, UpdateCallback};
pub use config::{CacheConfig, Config, LoggingConfig, StoreBackend};
