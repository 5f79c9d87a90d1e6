//! The facade running against a file-backed SQLite store.

mod common;

use common::counting_fetch;
use revalidate::adapters::sqlite::{initialize_database, SqliteCacheStore};
use revalidate::{CacheKey, CacheOptions, CacheService, CacheStore, Operation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Location {
    id: String,
    name: String,
}

fn locations(name: &str) -> Vec<Location> {
    vec![Location {
        id: "loc-1".to_string(),
        name: name.to_string(),
    }]
}

async fn open_store(dir: &TempDir) -> SqliteCacheStore {
    let url = format!("sqlite:{}", dir.path().join("cache.db").display());
    let pool = initialize_database(&url, None).await.expect("database should open");
    SqliteCacheStore::new(pool)
}

#[tokio::test]
async fn test_swr_cycle_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let service = CacheService::new(Arc::new(open_store(&dir).await));
    let calls = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::new("locations", Operation::List, None, None).unwrap();

    let miss = service
        .with_cache(counting_fetch(&calls, locations("Depot")), CacheOptions::list("locations"))
        .await
        .unwrap();
    assert!(!miss.from_cache);

    let hit = service
        .with_cache(counting_fetch(&calls, locations("Warehouse")), CacheOptions::list("locations"))
        .await
        .unwrap();
    assert!(hit.from_cache);
    assert_eq!(hit.data, locations("Depot"));

    service.coordinator().wait_idle(&key).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stored = service.store().get(&key).await.unwrap().unwrap();
    assert_eq!(stored.value, serde_json::to_value(locations("Warehouse")).unwrap());
}

#[tokio::test]
async fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = CacheService::new(Arc::new(open_store(&dir).await));
        service
            .with_cache(|| async { Ok(locations("Depot")) }, CacheOptions::detail("locations", "loc-1"))
            .await
            .unwrap();
    }

    let service = CacheService::new(Arc::new(open_store(&dir).await));
    let calls = Arc::new(AtomicUsize::new(0));
    let response = service
        .with_cache(counting_fetch(&calls, locations("Moved")), CacheOptions::detail("locations", "loc-1"))
        .await
        .unwrap();

    assert!(response.from_cache);
    assert_eq!(response.data, locations("Depot"));
}

#[tokio::test]
async fn test_collection_invalidation_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let service = CacheService::new(Arc::new(store.clone()));

    for options in [
        CacheOptions::list("edges"),
        CacheOptions::list("edges").param("page", 2),
        CacheOptions::list("locations"),
    ] {
        service
            .with_cache(|| async { Ok(locations("x")) }, options)
            .await
            .unwrap();
    }

    assert_eq!(service.admin().clear_collection("edges").await, 2);
    assert_eq!(store.len().await.unwrap(), 1);
    assert_eq!(service.admin().clear_all().await, 1);
    assert!(store.is_empty().await.unwrap());
}
