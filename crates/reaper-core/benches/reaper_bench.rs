//! Performance benchmarks for Reaper core primitives

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reaper_core::ContextValue;

fn benchmark_context_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_lookup");

    let ctx: ContextValue = serde_json::json!({
        "llm": {"provider": "openai", "model": "gpt-4", "functions": ["a", "b", "c"]},
        "user": {"id": "u-1", "roles": ["admin", "billing"]},
    })
    .into();

    for path in ["llm.model", "user.roles[1]", "llm.functions[2]"].iter() {
        group.bench_with_input(BenchmarkId::new("lookup", path), path, |b, path| {
            b.iter(|| black_box(ctx.lookup(path)));
        });
    }

    group.finish();
}

fn benchmark_canonical_json(c: &mut Criterion) {
    let ctx: ContextValue = serde_json::json!({
        "llm": {"provider": "openai", "model": "gpt-4"},
        "user": {"id": "u-1"},
    })
    .into();

    c.bench_function("canonical_json", |b| b.iter(|| black_box(ctx.canonical_json())));
}

criterion_group!(benches, benchmark_context_lookup, benchmark_canonical_json);
criterion_main!(benches);
