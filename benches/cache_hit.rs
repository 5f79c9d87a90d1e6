//! Benchmarks for key derivation and the cache-hit path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use revalidate::{CacheKey, CacheOptions, CacheService, Operation, Params};
use serde_json::{json, Value};

fn params(count: usize) -> Params {
    (0..count)
        .map(|i| (format!("param_{i}"), json!({ "value": i, "tags": ["a", "b"] })))
        .collect()
}

/// Benchmark key derivation with growing param sets.
fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");

    for count in [0usize, 4, 32] {
        let params = params(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &params, |b, params| {
            b.iter(|| {
                CacheKey::new(
                    black_box("things"),
                    Operation::List,
                    None,
                    Some(black_box(params)),
                )
            });
        });
    }

    group.finish();
}

/// Benchmark a warm `with_cache` call, refresh trigger included.
fn bench_cache_hit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let service = CacheService::in_memory();
    let payload = Value::Array(
        (0..100)
            .map(|i| json!({ "id": i, "name": format!("edge-{i}") }))
            .collect(),
    );

    runtime.block_on(async {
        let seed = payload.clone();
        service
            .with_cache(move || async move { Ok(seed) }, CacheOptions::list("edges"))
            .await
            .unwrap();
    });

    c.bench_function("cache_hit", |b| {
        b.to_async(&runtime).iter(|| {
            let fresh = payload.clone();
            let service = &service;
            async move {
                let response = service
                    .with_cache(move || async move { Ok(fresh) }, CacheOptions::list("edges"))
                    .await
                    .unwrap();
                black_box(response.from_cache)
            }
        });
    });
}

criterion_group!(benches, bench_key_derivation, bench_cache_hit);
criterion_main!(benches);
