//! The audit log (C8): an append-only store of `EvaluationRecord`s with
//! request/policy lookups and aggregate stats. Writes must never block the
//! evaluation reply path; callers are expected to fire-and-forget `log`.

use crate::record::EvaluationRecord;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use policy_engine::Decision;
use reaper_core::{PolicyId, RequestId, Result};

#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub policy_ids: Option<Vec<PolicyId>>,
    pub decision: Option<Decision>,
    pub allowed: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct AuditStats {
    pub total: u64,
    pub allow_count: u64,
    pub deny_count: u64,
    pub warn_count: u64,
    pub modify_count: u64,
    pub avg_evaluation_time_ms: f64,
    pub cache_hit_rate: f64,
}

pub trait AuditLog: Send + Sync {
    fn log(&self, record: EvaluationRecord) -> Result<EvaluationRecord>;
    fn find_by_request_id(&self, request_id: RequestId) -> Result<Option<EvaluationRecord>>;
    fn find(&self, filters: QueryFilters) -> Result<Vec<EvaluationRecord>>;
    fn find_by_policy_id(&self, policy_id: &str) -> Result<Vec<EvaluationRecord>>;
    fn get_stats(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<AuditStats>;
    fn delete_older_than(&self, days: i64) -> Result<usize>;
}

/// In-process backing store. A real deployment would back this with a
/// database table; this keeps the workspace self-contained for tests and
/// the sidecar evaluation service.
#[derive(Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<EvaluationRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn log(&self, record: EvaluationRecord) -> Result<EvaluationRecord> {
        let mut records = self.records.write();
        records.push(record.clone());
        Ok(record)
    }

    fn find_by_request_id(&self, request_id: RequestId) -> Result<Option<EvaluationRecord>> {
        let records = self.records.read();
        Ok(records.iter().find(|r| r.request_id == request_id).cloned())
    }

    fn find(&self, filters: QueryFilters) -> Result<Vec<EvaluationRecord>> {
        let records = self.records.read();
        let mut matching: Vec<EvaluationRecord> = records
            .iter()
            .filter(|r| {
                filters.policy_ids.as_ref().is_none_or(|ids| {
                    ids.iter().any(|id| r.policy_ids.contains(id))
                })
            })
            .filter(|r| filters.decision.is_none_or(|d| r.decision == d))
            .filter(|r| filters.allowed.is_none_or(|a| r.allowed == a))
            .filter(|r| filters.start_date.is_none_or(|start| r.created_at >= start))
            .filter(|r| filters.end_date.is_none_or(|end| r.created_at <= end))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filters.offset.unwrap_or(0);
        let matching: Vec<EvaluationRecord> = matching.into_iter().skip(offset).collect();
        Ok(match filters.limit {
            Some(limit) => matching.into_iter().take(limit).collect(),
            None => matching,
        })
    }

    fn find_by_policy_id(&self, policy_id: &str) -> Result<Vec<EvaluationRecord>> {
        let records = self.records.read();
        let mut matching: Vec<EvaluationRecord> = records
            .iter()
            .filter(|r| r.matched_policies.iter().any(|id| id == policy_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    fn get_stats(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<AuditStats> {
        let records = self.records.read();
        let scoped: Vec<&EvaluationRecord> = records
            .iter()
            .filter(|r| start.is_none_or(|s| r.created_at >= s))
            .filter(|r| end.is_none_or(|e| r.created_at <= e))
            .collect();

        if scoped.is_empty() {
            return Ok(AuditStats::default());
        }

        let total = scoped.len() as u64;
        let mut stats = AuditStats { total, ..Default::default() };
        let mut time_sum = 0.0;
        let mut cache_hits = 0u64;
        for record in &scoped {
            match record.decision {
                Decision::Allow => stats.allow_count += 1,
                Decision::Deny => stats.deny_count += 1,
                Decision::Warn => stats.warn_count += 1,
                Decision::Modify => stats.modify_count += 1,
            }
            time_sum += record.evaluation_time_ms;
            if record.cached {
                cache_hits += 1;
            }
        }
        stats.avg_evaluation_time_ms = time_sum / total as f64;
        stats.cache_hit_rate = cache_hits as f64 / total as f64;
        Ok(stats)
    }

    fn delete_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok(before - records.len())
    }
}
