//! Service layer: the read-through facade and the pieces behind it.

pub mod cache_admin;
pub mod cache_service;
pub mod cache_stats;
pub mod global;
pub mod refresh_coordinator;

pub use cache_admin::CacheAdmin;
pub use cache_service::CacheService;
pub use cache_stats::CacheStats;
pub use refresh_coordinator::{RefreshCoordinator, RefreshState};
