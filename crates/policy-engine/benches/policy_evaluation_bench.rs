//! Policy engine benchmarks: single-rule evaluation and multi-policy
//! aggregation under the nested-condition shape from the test scenarios.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use policy_engine::{
    Action, Condition, EvaluationRequest, Policy, PolicyEngine, PolicyMetadata, PolicyRule, PolicyStatus,
};
use reaper_core::ContextValue;

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

fn nested_condition() -> Condition {
    Condition::and(vec![
        Condition::or(vec![
            Condition::eq("llm.provider", "openai"),
            Condition::eq("llm.provider", "anthropic"),
        ]),
        Condition::gt("llm.estimatedTokens", 1000.0),
        Condition::not(Condition::eq("llm.containsPII", true)),
    ])
}

fn engine_with_policies(count: usize) -> PolicyEngine {
    let engine = PolicyEngine::new();
    for i in 0..count {
        engine.add(Policy {
            metadata: metadata(&format!("p{i}"), (count - i) as i64),
            rules: vec![PolicyRule {
                id: format!("p{i}-rule"),
                name: format!("p{i}-rule"),
                condition: nested_condition(),
                action: Action::warn("flagged"),
                enabled: true,
                description: None,
            }],
            status: PolicyStatus::Active,
        });
    }
    engine
}

fn context() -> ContextValue {
    serde_json::json!({
        "llm": {"provider": "openai", "model": "gpt-4", "prompt": "a fairly long prompt".repeat(50)}
    })
    .into()
}

fn bench_single_policy(c: &mut Criterion) {
    let engine = engine_with_policies(1);
    let req = EvaluationRequest::new(context());
    c.bench_function("evaluate_single_policy", |b| {
        b.iter(|| engine.evaluate(black_box(&req)).unwrap())
    });
}

fn bench_twenty_policies(c: &mut Criterion) {
    let engine = engine_with_policies(20);
    let req = EvaluationRequest::new(context());
    c.bench_function("evaluate_twenty_policies", |b| {
        b.iter(|| engine.evaluate(black_box(&req)).unwrap())
    });
}

criterion_group!(benches, bench_single_policy, bench_twenty_policies);
criterion_main!(benches);
