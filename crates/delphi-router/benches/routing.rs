//! Template matching benchmarks.
//!
//! Run with: `cargo bench -p delphi-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use delphi_router::{MethodRouter, Router};
use http::Method;

fn build_router(num_templates: usize) -> Router<MethodRouter<usize>> {
    let mut router = Router::new();
    let per_kind = num_templates / 4;

    for i in 0..per_kind {
        router
            .insert(&format!("/api/v1/resource{i}"), MethodRouter::new().get(i))
            .unwrap();
        router
            .insert(&format!("/api/v1/resource{i}/{{id}}"), MethodRouter::new().get(i))
            .unwrap();
        router
            .insert(
                &format!("/api/v1/org/{{orgId}}/resource{i}/{{id}}"),
                MethodRouter::new().get(i),
            )
            .unwrap();
        router
            .insert(
                &format!("/api/v1/export{i}/{{name}}.{{format}}"),
                MethodRouter::new().get(i),
            )
            .unwrap();
    }

    router
}

fn bench_static_match(c: &mut Criterion) {
    let router = build_router(100);

    c.bench_function("static_match", |b| {
        b.iter(|| black_box(router.match_route(&Method::GET, "/api/v1/resource20")));
    });
}

fn bench_param_match(c: &mut Criterion) {
    let router = build_router(100);

    c.bench_function("param_match", |b| {
        b.iter(|| black_box(router.match_route(&Method::GET, "/api/v1/resource20/12345")));
    });
}

fn bench_nested_param_match(c: &mut Criterion) {
    let router = build_router(100);

    c.bench_function("nested_param_match", |b| {
        b.iter(|| {
            black_box(router.match_route(&Method::GET, "/api/v1/org/acme-corp/resource10/12345"));
        });
    });
}

fn bench_pattern_match(c: &mut Criterion) {
    let router = build_router(100);

    c.bench_function("pattern_match", |b| {
        b.iter(|| black_box(router.match_route(&Method::GET, "/api/v1/export5/report.csv")));
    });
}

fn bench_miss(c: &mut Criterion) {
    let router = build_router(100);

    c.bench_function("miss", |b| {
        b.iter(|| black_box(router.match_route(&Method::GET, "/api/v1/nonexistent/path")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_templates in [12, 100, 400, 1000] {
        let router = build_router(num_templates);

        group.bench_with_input(
            BenchmarkId::new("param_match", num_templates),
            &num_templates,
            |b, &n| {
                let path = format!("/api/v1/resource{}/12345", n / 8);
                b.iter(|| black_box(router.match_route(&Method::GET, &path)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_nested_param_match,
    bench_pattern_match,
    bench_miss,
    bench_scaling
);
criterion_main!(benches);
