use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sift::{Engine, EngineConfig, RawContext, RawValue};

const EXPR: &str = "user.score * 2 > limit ? 'over' : user.name + ' ok'";

fn context() -> RawContext {
    let user = RawContext::from([
        ("name".to_string(), RawValue::from("ada")),
        ("score".to_string(), RawValue::from(42i64)),
    ]);
    RawContext::from([
        ("user".to_string(), RawValue::from(user)),
        ("limit".to_string(), RawValue::from(80i64)),
    ])
}

/// A zero-length window expires every admission immediately, so no
/// iteration is throttled.
fn unthrottled(cache_capacity: usize) -> Engine {
    Engine::with_config(EngineConfig {
        rate_window: Duration::ZERO,
        cache_capacity,
        ..EngineConfig::default()
    })
}

fn bench_evaluate(c: &mut Criterion) {
    let ctx = context();
    let cached = unthrottled(100);
    let uncached = unthrottled(0);

    let mut g = c.benchmark_group("evaluate");
    g.bench_function("cached", |b| {
        b.iter(|| cached.evaluate(black_box(EXPR), black_box(&ctx)))
    });
    g.bench_function("uncached", |b| {
        b.iter(|| uncached.evaluate(black_box(EXPR), black_box(&ctx)))
    });
    g.finish();
}

fn bench_interpolate(c: &mut Criterion) {
    let ctx = context();
    let engine = unthrottled(100);
    let template = "Hi {{user.name}}, your score is {{user.score}} of {{limit}}. ".repeat(5);

    c.bench_function("interpolate_15_placeholders", |b| {
        b.iter(|| engine.interpolate(black_box(&template), black_box(&ctx)))
    });
}

criterion_group!(benches, bench_evaluate, bench_interpolate);
criterion_main!(benches);
