//! Benchmarks the CLI's embedded-evaluation path: parse a policy document,
//! load it into an engine, evaluate - the same primitives `reaper evaluate
//! --local` drives, without shelling out to a binary.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use policy_engine::{parse_yaml, EvaluationRequest, PolicyEngine};

const POLICY_YAML: &str = r#"
metadata:
  id: cli-bench-policy
  name: cli-bench-policy
  version: "1.0.0"
  namespace: default
  priority: 10
rules:
  - id: deny-banned-model
    condition:
      field: llm.model
      operator: eq
      value: banned-model
    action:
      decision: deny
      reason: model is banned
"#;

fn bench_parse_yaml(c: &mut Criterion) {
    c.bench_function("cli_parse_yaml_policy", |b| {
        b.iter(|| parse_yaml(black_box(POLICY_YAML)).unwrap())
    });
}

fn bench_local_evaluate(c: &mut Criterion) {
    let engine = PolicyEngine::new();
    engine.add(parse_yaml(POLICY_YAML).unwrap());
    let context: reaper_core::ContextValue = serde_json::json!({"llm": {"model": "banned-model"}}).into();

    c.bench_function("cli_local_evaluate", |b| {
        b.iter(|| {
            let req = EvaluationRequest::new(black_box(context.clone()));
            engine.evaluate(&req).unwrap()
        })
    });
}

criterion_group!(benches, bench_parse_yaml, bench_local_evaluate);
criterion_main!(benches);
