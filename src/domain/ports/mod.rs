//! Port trait definitions (Hexagonal Architecture)
//!
//! - CacheStore: keyed storage of cached request results
//!
//! Services depend on this trait rather than a concrete backend, so tests and
//! applications can pick the in-memory or SQLite adapter.

pub mod cache_store;

pub use cache_store::CacheStore;
