//! Common test utilities for integration tests
//!
//! Provides shared fixtures, fetch helpers and store doubles used across
//! multiple integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::future::BoxFuture;
use revalidate::{CacheEntry, CacheError, CacheKey, CacheResult, CacheStore, InMemoryCacheStore};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Fetch that counts how many times it is invoked.
pub fn counting_fetch<T>(calls: &Arc<AtomicUsize>, value: T) -> impl FnOnce() -> BoxFuture<'static, anyhow::Result<T>>
where
    T: Send + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(value) })
    }
}

/// Counting fetch that does not resolve until `gate` is notified.
pub fn gated_fetch<T>(
    calls: &Arc<AtomicUsize>,
    gate: &Arc<Notify>,
    value: T,
) -> impl FnOnce() -> BoxFuture<'static, anyhow::Result<T>>
where
    T: Send + 'static,
{
    let calls = Arc::clone(calls);
    let gate = Arc::clone(gate);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            gate.notified().await;
            Ok(value)
        })
    }
}

/// Fetch that always fails.
pub fn failing_fetch<T>(message: &'static str) -> impl FnOnce() -> BoxFuture<'static, anyhow::Result<T>>
where
    T: Send + 'static,
{
    move || Box::pin(async move { Err(anyhow::anyhow!(message)) })
}

/// In-memory store whose reads or writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryCacheStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> CacheResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CacheError::StorageFailed(format!("{what} rejected: quota exceeded")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, value: Value) -> CacheResult<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        self.inner.delete(key).await
    }

    async fn delete_by_collection(&self, collection: &str) -> CacheResult<usize> {
        self.inner.delete_by_collection(collection).await
    }

    async fn clear_all(&self) -> CacheResult<usize> {
        self.inner.clear_all().await
    }

    async fn len(&self) -> CacheResult<usize> {
        self.inner.len().await
    }
}
