//! Background refresh coordination.
//!
//! Each key moves through `Idle -> Refreshing -> Idle`. A key is Refreshing
//! while it owns a slot in the in-flight map; the slot is claimed under the
//! map's mutex before the task is spawned and released when the task ends,
//! so two triggers for the same key can never both start a fetch.
//!
//! Refresh results are written to the store in the order the fetches finish.
//! With at most one fetch per key in flight that is also trigger order.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn, Instrument};

use super::cache_stats::StatsCounters;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::{now_ms, CacheKey, UpdateCallback};
use crate::domain::ports::CacheStore;

/// Refresh state of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Bookkeeping for one in-flight refresh.
struct RefreshTask {
    /// Closes when the task finishes.
    done: watch::Receiver<()>,
    started_at_ms: i64,
}

type InFlight = Arc<Mutex<HashMap<CacheKey, RefreshTask>>>;

/// Releases a key's in-flight slot when the refresh task ends, including
/// when the fetch or the callback panics.
struct InFlightSlot {
    key: CacheKey,
    in_flight: InFlight,
    _done: watch::Sender<()>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = in_flight.remove(&self.key) {
            debug!(
                key = %self.key,
                elapsed_ms = now_ms() - task.started_at_ms,
                "refresh slot released"
            );
        }
    }
}

/// Runs fetches on behalf of the cache and writes their results back.
#[derive(Clone)]
pub struct RefreshCoordinator {
    store: Arc<dyn CacheStore>,
    in_flight: InFlight,
    stats: Arc<StatsCounters>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_stats(store, Arc::new(StatsCounters::default()))
    }

    pub(crate) fn with_stats(store: Arc<dyn CacheStore>, stats: Arc<StatsCounters>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stats,
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, RefreshTask>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh `key` in the background unless a refresh is already running.
    ///
    /// Never waits on the fetch. On success the store is updated and
    /// `on_result` receives the fresh data; on failure the cached entry is
    /// left as it was and the error is only logged.
    ///
    /// `fetch` is only called once the key's slot has been claimed. Returns
    /// `true` if a new task was spawned, `false` if the request was coalesced
    /// into the running one (in which case `fetch` is never called).
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger_background_refresh<T, F, Fut>(
        &self,
        key: CacheKey,
        fetch: F,
        on_result: Option<UpdateCallback<T>>,
    ) -> bool
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (done_tx, done_rx) = watch::channel(());
        {
            let mut in_flight = self.lock_in_flight();
            if in_flight.contains_key(&key) {
                self.stats.refresh_coalesced();
                debug!(key = %key, "refresh already in flight; not starting another");
                return false;
            }
            in_flight.insert(
                key.clone(),
                RefreshTask {
                    done: done_rx,
                    started_at_ms: now_ms(),
                },
            );
        }
        self.stats.refresh_started();

        // Lock released here: a runtime that is shutting down drops the
        // spawned future inline, which runs the slot's Drop.
        let slot = InFlightSlot {
            key: key.clone(),
            in_flight: Arc::clone(&self.in_flight),
            _done: done_tx,
        };
        let fetch = fetch();
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let span = tracing::debug_span!("background_refresh", key = %key);

        tokio::spawn(
            async move {
                let _slot = slot;
                match fetch.await {
                    Ok(data) => {
                        let encoded = encode(&stats, &key, &data);
                        if let Some(value) = encoded {
                            write_through(store.as_ref(), &stats, &key, value).await;
                            debug!("background refresh stored fresh data");
                        }
                        if let Some(callback) = on_result {
                            callback(data);
                        }
                    }
                    Err(err) => {
                        stats.refresh_failed();
                        warn!(error = %format!("{err:#}"), "background refresh failed; keeping cached value");
                    }
                }
            }
            .instrument(span),
        );

        true
    }

    /// Fetch in the foreground and cache the result.
    ///
    /// Fetch errors are returned as [`CacheError::FetchFailed`] and nothing is
    /// written. A result that cannot be stored is still returned.
    pub async fn fetch_and_populate<T, Fut>(&self, key: &CacheKey, fetch: Fut) -> CacheResult<T>
    where
        T: Serialize,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let data = fetch.await.map_err(CacheError::FetchFailed)?;
        if let Some(value) = encode(&self.stats, key, &data) {
            write_through(self.store.as_ref(), &self.stats, key, value).await;
        }
        Ok(data)
    }

    pub fn refresh_state(&self, key: &CacheKey) -> RefreshState {
        if self.lock_in_flight().contains_key(key) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock_in_flight().len()
    }

    /// Wait until `key` is Idle. Returns immediately if it already is.
    pub async fn wait_idle(&self, key: &CacheKey) {
        let done = self.lock_in_flight().get(key).map(|task| task.done.clone());
        if let Some(mut done) = done {
            // Only ever resolves with Err, once the task drops its sender.
            let _ = done.changed().await;
        }
    }

    /// Wait for every refresh that is in flight right now.
    pub async fn drain(&self) {
        let pending: Vec<watch::Receiver<()>> = self
            .lock_in_flight()
            .values()
            .map(|task| task.done.clone())
            .collect();

        futures::future::join_all(pending.into_iter().map(|mut done| async move {
            let _ = done.changed().await;
        }))
        .await;
    }
}

/// JSON form of freshly fetched data, `None` (logged and counted) if it
/// cannot be represented.
fn encode<T: Serialize>(stats: &StatsCounters, key: &CacheKey, data: &T) -> Option<Value> {
    match serde_json::to_value(data) {
        Ok(value) => Some(value),
        Err(err) => {
            stats.storage_failed();
            warn!(key = %key, error = %err, "fetched data is not JSON-serializable; not caching");
            None
        }
    }
}

/// Store `value` under `key`. Failures are logged and counted; if the write
/// was rejected the old entry is dropped too so the key misses rather than
/// serving data older than what the caller just saw.
async fn write_through(store: &dyn CacheStore, stats: &StatsCounters, key: &CacheKey, value: Value) {
    if let Err(err) = store.set(key, value).await {
        stats.storage_failed();
        warn!(key = %key, error = %err, "cache write failed; key will miss until the next successful write");
        if let Err(err) = store.delete(key).await {
            warn!(key = %key, error = %err, "failed to drop stale entry after write failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCacheStore;
    use crate::domain::models::Operation;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn setup() -> (Arc<InMemoryCacheStore>, RefreshCoordinator) {
        let store = Arc::new(InMemoryCacheStore::new());
        let coordinator = RefreshCoordinator::new(store.clone());
        (store, coordinator)
    }

    fn key() -> CacheKey {
        CacheKey::new("edges", Operation::List, None, None).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_and_populate_writes_store() {
        let (store, coordinator) = setup();

        let data = coordinator
            .fetch_and_populate(&key(), async { Ok(json!(["a"])) })
            .await
            .unwrap();

        assert_eq!(data, json!(["a"]));
        assert_eq!(store.get(&key()).await.unwrap().unwrap().value, json!(["a"]));
    }

    #[tokio::test]
    async fn test_fetch_and_populate_never_caches_errors() {
        let (store, coordinator) = setup();

        let result: CacheResult<Value> = coordinator
            .fetch_and_populate(&key(), async { Err(anyhow::anyhow!("503")) })
            .await;

        assert!(matches!(result, Err(CacheError::FetchFailed(_))));
        assert!(store.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_trigger_is_coalesced() {
        let (store, coordinator) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first_calls = calls.clone();
        let started = coordinator.trigger_background_refresh::<Value, _, _>(
            key(),
            move || {
                first_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let _ = release_rx.await;
                    Ok(json!("fresh"))
                }
            },
            None,
        );
        assert!(started);
        assert_eq!(coordinator.refresh_state(&key()), RefreshState::Refreshing);

        let second_calls = calls.clone();
        let coalesced = !coordinator.trigger_background_refresh::<Value, _, _>(
            key(),
            move || {
                second_calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!("duplicate")) }
            },
            None,
        );
        assert!(coalesced);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        release_tx.send(()).unwrap();
        coordinator.wait_idle(&key()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.refresh_state(&key()), RefreshState::Idle);
        assert_eq!(store.get(&key()).await.unwrap().unwrap().value, json!("fresh"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_entry() {
        let (store, coordinator) = setup();
        store.set(&key(), json!("stale")).await.unwrap();
        let before = store.get(&key()).await.unwrap().unwrap();

        coordinator.trigger_background_refresh::<Value, _, _>(
            key(),
            || async { Err(anyhow::anyhow!("timeout")) },
            None,
        );
        coordinator.wait_idle(&key()).await;

        assert_eq!(store.get(&key()).await.unwrap().unwrap(), before);
        assert_eq!(coordinator.stats.snapshot().refresh_failures, 1);
    }

    #[tokio::test]
    async fn test_callback_receives_fresh_data() {
        let (_store, coordinator) = setup();
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let callback: UpdateCallback<Value> = Arc::new(move |data| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(data);
            }
        });

        coordinator.trigger_background_refresh(key(), || async { Ok(json!({"v": 2})) }, Some(callback));

        assert_eq!(rx.await.unwrap(), json!({"v": 2}));
    }

    async fn exploding_fetch() -> anyhow::Result<Value> {
        panic!("fetch exploded")
    }

    #[tokio::test]
    async fn test_panicking_fetch_releases_slot() {
        let (_store, coordinator) = setup();

        coordinator.trigger_background_refresh::<Value, _, _>(key(), exploding_fetch, None);
        coordinator.wait_idle(&key()).await;

        assert_eq!(coordinator.in_flight_count(), 0);
        assert!(coordinator.trigger_background_refresh::<Value, _, _>(key(), || async { Ok(json!(1)) }, None));
        coordinator.drain().await;
    }

    #[tokio::test]
    async fn test_drain_waits_for_all_keys() {
        let (store, coordinator) = setup();
        for collection in ["edges", "locations", "things"] {
            let key = CacheKey::new(collection, Operation::List, None, None).unwrap();
            coordinator.trigger_background_refresh::<Value, _, _>(
                key,
                || async {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    Ok(json!([]))
                },
                None,
            );
        }

        coordinator.drain().await;

        assert_eq!(coordinator.in_flight_count(), 0);
        assert_eq!(store.len().await.unwrap(), 3);
    }

    #[test]
    fn test_trigger_on_shut_down_runtime_releases_slot() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let handle = runtime.handle().clone();
        runtime.shutdown_background();

        let (_store, coordinator) = setup();
        let (tx, rx) = std::sync::mpsc::channel();
        let worker = coordinator.clone();
        std::thread::spawn(move || {
            let _entered = handle.enter();
            let started = worker.trigger_background_refresh::<Value, _, _>(
                key(),
                || async { Ok(json!(1)) },
                None,
            );
            let _ = tx.send(started);
        });

        let started = rx
            .recv_timeout(std::time::Duration::from_secs(3))
            .expect("trigger returned");
        assert!(started);
        assert_eq!(coordinator.in_flight_count(), 0);
    }
}
