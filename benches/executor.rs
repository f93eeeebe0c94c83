use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use http::{HeaderMap, StatusCode};
use restexec::{RawResponse, RequestSpec, RestClient, Transport, TransportFuture};
use serde::Deserialize;
use tokio::runtime::Runtime;

/// Answers with `failures` server errors in every `failures + 1` requests, then 200.
struct InMemoryTransport {
    failures: usize,
    sent: AtomicUsize,
}

impl Transport for InMemoryTransport {
    fn send<'a>(&'a self, _request: &'a RequestSpec) -> TransportFuture<'a> {
        let sent = self.sent.fetch_add(1, Ordering::Relaxed);
        let failed = sent % (self.failures + 1) < self.failures;
        Box::pin(async move {
            if failed {
                return Ok(RawResponse::new(
                    StatusCode::BAD_GATEWAY,
                    HeaderMap::new(),
                    "",
                ));
            }
            Ok(RawResponse::new(
                StatusCode::OK,
                HeaderMap::new(),
                r#"{"id":42,"name":"widget","tags":["a","b"]}"#,
            ))
        })
    }
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Item {
    id: u64,
    name: String,
    tags: Vec<String>,
}

fn benchmark_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build benchmark runtime")
}

fn benchmark_client(failures: usize) -> RestClient {
    RestClient::builder()
        .base_url("http://bench.local")
        .transport(Arc::new(InMemoryTransport {
            failures,
            sent: AtomicUsize::new(0),
        }))
        .build()
}

fn bench_success_decode(c: &mut Criterion) {
    let runtime = benchmark_runtime();
    let client = benchmark_client(0);

    let mut group = c.benchmark_group("execute_success");
    group.bench_function("get_200_json", |b| {
        b.to_async(&runtime).iter(|| async {
            let item = client
                .get::<Item>("/items/42")
                .add_param("expand", "tags")
                .execute()
                .await
                .expect("in-memory request should succeed");
            black_box(item);
        });
    });
    group.finish();
}

fn bench_retry_loop(c: &mut Criterion) {
    let runtime = benchmark_runtime();

    let mut group = c.benchmark_group("execute_retry_loop");
    for failures in [1_usize, 3] {
        let client = benchmark_client(failures);
        group.bench_with_input(
            BenchmarkId::from_parameter(failures),
            &failures,
            |b, &failures| {
                b.to_async(&runtime).iter(|| async {
                    let item = client
                        .get::<Item>("/items/42")
                        .retry_server_error(true)
                        .retry_count(failures as u32)
                        .execute()
                        .await
                        .expect("last attempt should succeed");
                    black_box(item);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(4));
    targets = bench_success_decode, bench_retry_loop
);
criterion_main!(benches);
