// Installs the global tracing subscriber, so this file holds a single test
// and runs as its own binary.

use revalidate::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};
use revalidate::{CacheOptions, CacheService};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_logger_writes_cache_events_to_file() {
    let temp_dir = TempDir::new().unwrap();

    let config = LogConfig {
        level: "debug".to_string(),
        format: LogFormat::Pretty,
        log_dir: Some(temp_dir.path().to_path_buf()),
        rotation: RotationPolicy::Never,
    };

    let logger = LoggerImpl::init(&config).unwrap();
    assert!(LoggerImpl::init(&config).is_err(), "second init must fail");

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let service = CacheService::in_memory();
        service
            .with_cache(|| async { Ok(json!([1])) }, CacheOptions::list("edges"))
            .await
            .unwrap();
        service.admin().clear_collection("edges").await;
    });

    // Flush the non-blocking writer.
    drop(logger);

    let contents = fs::read_to_string(temp_dir.path().join("revalidate.log")).unwrap();
    assert!(contents.contains("cache miss; fetching"));
    assert!(contents.contains("cleared collection cache"));
}
