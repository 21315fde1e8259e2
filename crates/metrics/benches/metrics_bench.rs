//! Audit log benchmarks: append throughput and stats aggregation over a
//! warmed-up record set.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use metrics::{AuditLog, EvaluationRecord, InMemoryAuditLog};
use policy_engine::{Decision, PolicyDecision};
use reaper_core::RequestId;

fn fake_decision(decision: Decision) -> PolicyDecision {
    PolicyDecision {
        decision,
        allowed: decision != Decision::Deny,
        reason: None,
        matched_policies: vec!["p1".to_string()],
        matched_rules: vec!["p1-rule".to_string()],
        modifications: None,
        evaluation_time_ms: 1.0,
        metadata: None,
        trace: None,
    }
}

fn record(decision: Decision) -> EvaluationRecord {
    EvaluationRecord::new(
        RequestId::new_v4(),
        vec!["p1".to_string()],
        serde_json::json!({"llm": {"model": "gpt-4"}}).into(),
        &fake_decision(decision),
        false,
        Utc::now(),
    )
}

fn bench_log_append(c: &mut Criterion) {
    let log = InMemoryAuditLog::new();
    c.bench_function("audit_log_append", |b| {
        b.iter(|| log.log(black_box(record(Decision::Allow))).unwrap())
    });
}

fn bench_get_stats(c: &mut Criterion) {
    let log = InMemoryAuditLog::new();
    for i in 0..1000 {
        let decision = if i % 4 == 0 { Decision::Deny } else { Decision::Allow };
        log.log(record(decision)).unwrap();
    }
    c.bench_function("audit_log_get_stats_1000_records", |b| {
        b.iter(|| log.get_stats(black_box(None), black_box(None)).unwrap())
    });
}

criterion_group!(benches, bench_log_append, bench_get_stats);
criterion_main!(benches);
