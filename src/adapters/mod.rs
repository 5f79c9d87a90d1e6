//! Infrastructure adapters implementing the domain ports.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryCacheStore;
pub use sqlite::SqliteCacheStore;
