//! The Decision API (C9): the only surface the engine exposes upstream.
//! Wires the policy store (C7) into the engine's active-policy snapshot,
//! fronts evaluation with the two-tier cache (C6), and writes the audit
//! log (C8) for every non-dry-run evaluation.

use crate::store::{PolicyPatch, PolicyStore};
use chrono::Utc;
use message_queue::{fingerprint, TwoTierCache};
use metrics::{AuditLog, AuditStats, EvaluationRecord, QueryFilters};
use policy_engine::{self as engine_mod, validate, EvaluationRequest, Policy, PolicyDecision, PolicyEngine, ValidationResult};
use reaper_core::{PolicyId, ReaperError, RequestId, Result};
use std::sync::Arc;

/// Batch size limit per spec §4.8.
pub const MAX_BATCH_SIZE: usize = 100;

pub struct DecisionApi {
    engine: PolicyEngine,
    store: Arc<PolicyStore>,
    cache: Arc<TwoTierCache>,
    audit: Arc<dyn AuditLog>,
}

impl DecisionApi {
    pub fn new(store: Arc<PolicyStore>, cache: Arc<TwoTierCache>, audit: Arc<dyn AuditLog>) -> Self {
        let engine = PolicyEngine::new();
        for policy in store.find_active() {
            engine.update(policy);
        }
        Self { engine, store, cache, audit }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    pub fn cache(&self) -> &TwoTierCache {
        &self.cache
    }

    // -- policy CRUD (C7), kept in sync with the engine's active snapshot --

    pub fn create_policy(&self, policy: Policy, actor: Option<String>) -> Result<Policy> {
        let created = self.store.create(policy, actor)?;
        self.engine.update(created.clone());
        Ok(created)
    }

    pub fn get_policy(&self, id: &str) -> Option<Policy> {
        self.store.find_by_id(id)
    }

    pub fn list_active_policies(&self) -> Vec<Policy> {
        self.store.find_active()
    }

    pub fn list_policies_by_namespace(&self, namespace: &str) -> Vec<Policy> {
        self.store.find_by_namespace(namespace)
    }

    pub fn update_policy(&self, id: &str, patch: PolicyPatch) -> Result<Policy> {
        let updated = self.store.update(id, patch)?;
        self.engine.update(updated.clone());
        self.cache.delete(&format!("policy:{id}"));
        Ok(updated)
    }

    pub fn delete_policy(&self, id: &str) -> Result<()> {
        self.store.delete(id)?;
        self.engine.remove(id);
        self.cache.delete(&format!("policy:{id}"));
        Ok(())
    }

    pub fn validate_policy(&self, policy: &Policy) -> ValidationResult {
        validate(policy)
    }

    // -- evaluation (C9 core) --

    /// Cache is consulted only when `useCache ∧ ¬trace ∧ ¬dryRun` (spec
    /// §4.5's "Key semantics" paragraph). A cache hit is still audited,
    /// with `cached = true`.
    pub fn evaluate(&self, req: EvaluationRequest) -> Result<PolicyDecision> {
        let request_id = RequestId::new_v4();
        self.evaluate_with_id(request_id, req)
    }

    fn evaluate_with_id(&self, request_id: RequestId, req: EvaluationRequest) -> Result<PolicyDecision> {
        let eligible = req.use_cache && !req.trace && !req.dry_run;
        let key = fingerprint(&req.context, &req.policies);

        let (decision, cached) = if eligible {
            if let Some(decision) = self.cache.get::<PolicyDecision>(&key) {
                (decision, true)
            } else {
                let decision = self.engine.evaluate(&req)?;
                self.cache.set(&key, &decision, None)?;
                (decision, false)
            }
        } else {
            (self.engine.evaluate(&req)?, false)
        };

        if !req.dry_run {
            let record = EvaluationRecord::new(
                request_id,
                req.policies.clone(),
                req.context.clone(),
                &decision,
                cached,
                Utc::now(),
            )
            .with_scope(
                req.context.lookup_str("namespace"),
                req.context.lookup_str("user.id"),
                req.context.lookup_str("team.id"),
                req.context.lookup_str("project.id"),
            );
            self.audit.log(record)?;
        }

        Ok(decision)
    }

    /// Independent per-request evaluation; results are not required to
    /// share state across the batch, so a bounded sequential pass already
    /// satisfies the contract without introducing concurrency machinery
    /// the in-memory backing stores don't need.
    pub fn batch_evaluate(&self, reqs: Vec<EvaluationRequest>) -> Result<Vec<PolicyDecision>> {
        if reqs.len() > MAX_BATCH_SIZE {
            return Err(ReaperError::ValidationError {
                errors: vec![format!(
                    "batch size {} exceeds the limit of {MAX_BATCH_SIZE}",
                    reqs.len()
                )],
            });
        }
        reqs.into_iter().map(|req| self.evaluate(req)).collect()
    }

    pub fn simulate(&self, context: reaper_core::ContextValue, policies: Vec<PolicyId>) -> Result<PolicyDecision> {
        self.engine.evaluate(&EvaluationRequest::simulate(context, policies))
    }

    // -- audit history (delegates to C8) --

    pub fn find_by_request_id(&self, request_id: RequestId) -> Result<Option<EvaluationRecord>> {
        self.audit.find_by_request_id(request_id)
    }

    pub fn find_history(&self, filters: QueryFilters) -> Result<Vec<EvaluationRecord>> {
        self.audit.find(filters)
    }

    pub fn find_by_policy_id(&self, policy_id: &str) -> Result<Vec<EvaluationRecord>> {
        self.audit.find_by_policy_id(policy_id)
    }

    pub fn stats(&self, start: Option<chrono::DateTime<Utc>>, end: Option<chrono::DateTime<Utc>>) -> Result<AuditStats> {
        self.audit.get_stats(start, end)
    }
}

// Re-exported so callers constructing a `DecisionApi` don't need a direct
// `policy-engine` dependency just for `EvaluationRequest`.
pub use engine_mod::EvaluationRequest as DecisionRequest;
