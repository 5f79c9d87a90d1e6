//! Cached payloads and the response handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A cached payload together with the time it was last written.
///
/// The pair is always stored and loaded as a unit; a store never hands out a
/// value from one write with the timestamp of another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    /// Creation or last-refresh time, epoch milliseconds.
    pub stored_at_ms: i64,
}

impl CacheEntry {
    /// Stamp `value` with the current time.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            stored_at_ms: now_ms(),
        }
    }

    pub fn with_timestamp(value: Value, stored_at_ms: i64) -> Self {
        Self {
            value,
            stored_at_ms,
        }
    }

    pub fn stored_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.stored_at_ms)
    }

    /// Age of the entry relative to now. Never negative.
    pub fn age(&self) -> chrono::Duration {
        let age = Utc::now() - self.stored_at();
        age.max(chrono::Duration::zero())
    }
}

/// Result of a `with_cache` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResponse<T> {
    pub data: T,
    /// True when `data` came from the store rather than a fetch made for
    /// this call.
    pub from_cache: bool,
    /// When `data` was stored (hits) or fetched (misses and bypasses).
    pub timestamp_ms: i64,
}

impl<T> CacheResponse<T> {
    pub(crate) fn cached(data: T, timestamp_ms: i64) -> Self {
        Self {
            data,
            from_cache: true,
            timestamp_ms,
        }
    }

    pub(crate) fn fresh(data: T) -> Self {
        Self {
            data,
            from_cache: false,
            timestamp_ms: now_ms(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        millis_to_datetime(self.timestamp_ms)
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}
