//! Domain errors for the request cache.

use thiserror::Error;

/// Errors that can occur while serving a request through the cache.
///
/// Only [`CacheError::FetchFailed`] and [`CacheError::InvalidKey`] ever reach
/// callers of `with_cache`. Storage and serialization faults are absorbed by
/// the services and logged.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Fetch failed: {0:#}")]
    FetchFailed(anyhow::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Storage error: {0}")]
    StorageFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    /// Whether this error came from the wrapped fetch rather than the cache.
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        CacheError::StorageFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}
