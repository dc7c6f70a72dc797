// Criterion benchmarks for Book Exchange

use book_exchange::core::{distance::haversine_distance, filters::is_reciprocal_match, ExchangeEngine, RadiusUnit};
use book_exchange::models::{Coordinate, ExchangeRequest};
use book_exchange::services::{ExchangeStore, InMemoryStore};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn create_request(id: usize) -> ExchangeRequest {
    // Every other request wants "A" for "B" and vice versa
    let (desired, offered) = if id % 2 == 0 { ("A", "B") } else { ("B", "A") };
    let offered = vec![offered.to_string(), format!("book-{}", id % 50)];
    ExchangeRequest::new(
        format!("user-{}", id),
        "",
        desired,
        &offered,
        50.0 + (id % 100) as f64 * 0.01,
        20.0 + (id % 70) as f64 * 0.01,
    )
}

fn bench_haversine_distance(c: &mut Criterion) {
    let p = Coordinate::new(52.2297, 21.0122);
    let q = Coordinate::new(50.0647, 19.9450);

    c.bench_function("haversine_distance", |b| {
        b.iter(|| haversine_distance(black_box(p), black_box(q), RadiusUnit::Kilometers));
    });
}

fn bench_reciprocity_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("reciprocity_scan");

    for size in [100, 1_000, 10_000] {
        let requests: Vec<ExchangeRequest> = (0..size).map(create_request).collect();
        let probe = create_request(size + 2);

        group.bench_with_input(BenchmarkId::from_parameter(size), &requests, |b, requests| {
            b.iter(|| {
                requests
                    .iter()
                    .filter(|candidate| is_reciprocal_match(black_box(&probe), candidate))
                    .count()
            });
        });
    }

    group.finish();
}

fn bench_find_matching_requests(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("find_matching_requests");

    for size in [100, 1_000] {
        let store = Arc::new(InMemoryStore::new());
        let requests: Vec<ExchangeRequest> = (0..size).map(create_request).collect();
        runtime.block_on(async {
            for request in &requests {
                store.create_request(request).await.expect("insert");
            }
        });
        let engine = ExchangeEngine::new(store, RadiusUnit::Kilometers);
        let probe = requests[0].clone();

        // Matches exist after the first iteration, so this measures the
        // steady-state re-find path
        group.bench_with_input(BenchmarkId::from_parameter(size), &probe, |b, probe| {
            b.iter(|| {
                runtime
                    .block_on(engine.find_matching_requests(probe.id, &probe.user_id))
                    .expect("find")
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_reciprocity_scan,
    bench_find_matching_requests
);
criterion_main!(benches);
