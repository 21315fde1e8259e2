//! End-to-end Decision API benchmarks, exercising the store -> engine ->
//! cache -> audit path together rather than any single component alone.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use message_queue::TwoTierCache;
use metrics::InMemoryAuditLog;
use policy_engine::{Action, Condition, EvaluationRequest, Policy, PolicyMetadata, PolicyRule, PolicyStatus};
use reaper_core::CacheConfig;
use reaper_platform::{DecisionApi, PolicyStore};
use std::sync::Arc;

fn metadata(id: &str, priority: i64) -> PolicyMetadata {
    PolicyMetadata {
        id: id.to_string(),
        name: id.to_string(),
        version: "1.0.0".to_string(),
        namespace: "default".to_string(),
        description: None,
        tags: vec![],
        priority,
        created_at: None,
        updated_at: None,
        created_by: None,
    }
}

fn api_with_policies(count: usize) -> DecisionApi {
    let store = Arc::new(PolicyStore::new());
    let cache = Arc::new(TwoTierCache::new(CacheConfig { enabled: true, ttl_seconds: 300, max_size: 1000 }));
    let audit = Arc::new(InMemoryAuditLog::new());
    let api = DecisionApi::new(store, cache, audit);
    for i in 0..count {
        api.create_policy(
            Policy {
                metadata: metadata(&format!("p{i}"), (count - i) as i64),
                rules: vec![PolicyRule {
                    id: format!("p{i}-rule"),
                    name: format!("p{i}-rule"),
                    condition: Condition::gt("llm.estimatedTokens", 1000.0),
                    action: Action::warn("flagged"),
                    enabled: true,
                    description: None,
                }],
                status: PolicyStatus::Active,
            },
            None,
        )
        .unwrap();
    }
    api
}

fn context() -> reaper_core::ContextValue {
    serde_json::json!({"llm": {"provider": "openai", "model": "gpt-4", "prompt": "hello"}}).into()
}

fn bench_evaluate_cold(c: &mut Criterion) {
    let api = api_with_policies(10);
    c.bench_function("decision_api_evaluate_cold", |b| {
        b.iter(|| {
            let mut req = EvaluationRequest::new(black_box(context()));
            req.use_cache = false;
            api.evaluate(req).unwrap()
        })
    });
}

fn bench_evaluate_cached(c: &mut Criterion) {
    let api = api_with_policies(10);
    api.evaluate(EvaluationRequest::new(context())).unwrap();
    c.bench_function("decision_api_evaluate_cached", |b| {
        b.iter(|| api.evaluate(EvaluationRequest::new(black_box(context()))).unwrap())
    });
}

criterion_group!(benches, bench_evaluate_cold, bench_evaluate_cached);
criterion_main!(benches);
