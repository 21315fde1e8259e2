//! Two-tier cache benchmarks: a tier-1 hit path and a cold get_or_set path
//! that pays the fingerprint + tier-2 round trip once.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use message_queue::{fingerprint, TwoTierCache};
use reaper_core::{CacheConfig, ContextValue};

fn config() -> CacheConfig {
    CacheConfig { enabled: true, ttl_seconds: 300, max_size: 1000 }
}

fn context() -> ContextValue {
    serde_json::json!({
        "llm": {"provider": "openai", "model": "gpt-4", "prompt": "a fairly long prompt".repeat(50)}
    })
    .into()
}

fn bench_tier1_hit(c: &mut Criterion) {
    let cache = TwoTierCache::new(config());
    cache.set("warm-key", &"cached-value".to_string(), None).unwrap();
    c.bench_function("cache_get_tier1_hit", |b| {
        b.iter(|| cache.get::<String>(black_box("warm-key")))
    });
}

fn bench_get_or_set_cold(c: &mut Criterion) {
    let cache = TwoTierCache::new(config());
    let mut i = 0u64;
    c.bench_function("cache_get_or_set_cold", |b| {
        b.iter(|| {
            i += 1;
            let key = format!("cold-key-{i}");
            cache
                .get_or_set(black_box(&key), None, || Ok(42i64))
                .unwrap()
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let ctx = context();
    let policies = vec!["policy-a".to_string(), "policy-b".to_string(), "policy-c".to_string()];
    c.bench_function("cache_fingerprint", |b| {
        b.iter(|| fingerprint(black_box(&ctx), black_box(&policies)))
    });
}

criterion_group!(benches, bench_tier1_hit, bench_get_or_set_cold, bench_fingerprint);
criterion_main!(benches);
