//! Process-local storage adapters.

pub mod cache_store;

pub use cache_store::InMemoryCacheStore;
