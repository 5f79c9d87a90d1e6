//! Per-request cache options.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::cache_key::{CacheKey, Operation, Params};
use crate::domain::errors::CacheResult;

/// Callback invoked with freshly fetched data after a background refresh.
pub type UpdateCallback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// How a single `with_cache` call should be keyed and served.
///
/// ```
/// use revalidate::CacheOptions;
///
/// let options: CacheOptions<Vec<String>> = CacheOptions::list("things")
///     .param("type", "reader")
///     .param("page", 2);
/// assert_eq!(options.collection, "things");
/// ```
pub struct CacheOptions<T> {
    pub collection: String,
    pub operation: Operation,
    pub id: Option<String>,
    pub params: Option<Params>,
    /// Bypass the store entirely for this call.
    pub skip_cache: bool,
    pub on_update: Option<UpdateCallback<T>>,
}

impl<T> CacheOptions<T> {
    pub fn new(collection: impl Into<String>, operation: Operation) -> Self {
        Self {
            collection: collection.into(),
            operation,
            id: None,
            params: None,
            skip_cache: false,
            on_update: None,
        }
    }

    pub fn list(collection: impl Into<String>) -> Self {
        Self::new(collection, Operation::List)
    }

    pub fn detail(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(collection, Operation::Detail).with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Add a single query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(callback));
        self
    }

    /// Key this request is stored under.
    pub fn key(&self) -> CacheResult<CacheKey> {
        CacheKey::new(
            &self.collection,
            self.operation,
            self.id.as_deref(),
            self.params.as_ref(),
        )
    }
}

impl<T> Clone for CacheOptions<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            operation: self.operation,
            id: self.id.clone(),
            params: self.params.clone(),
            skip_cache: self.skip_cache,
            on_update: self.on_update.clone(),
        }
    }
}

impl<T> fmt::Debug for CacheOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("collection", &self.collection)
            .field("operation", &self.operation)
            .field("id", &self.id)
            .field("params", &self.params)
            .field("skip_cache", &self.skip_cache)
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}
