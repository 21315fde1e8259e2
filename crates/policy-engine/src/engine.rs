//! The policy engine (C5): multi-policy aggregation, context enrichment, and
//! optional tracing. The engine owns only `active` policies - a policy moved
//! out of `active` status is removed from this view by its caller, not by
//! the engine itself.

use crate::condition;
use crate::model::{Decision, Policy};
use crate::primitives::{self, CostEstimator};
use crate::trace::RuleTrace;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use reaper_core::{ContextValue, PolicyId, ReaperError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Hard cap applied when a caller sets no deadline, per the 30s/100ms
/// hard/soft budget design target.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub context: ContextValue,
    #[serde(default)]
    pub policies: Vec<PolicyId>,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Caller-imposed deadline in milliseconds; checked between rules and
    /// between policies. `None` falls back to `DEFAULT_DEADLINE`.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_use_cache() -> bool {
    true
}

impl EvaluationRequest {
    pub fn new(context: ContextValue) -> Self {
        Self { context, policies: Vec::new(), trace: false, dry_run: false, use_cache: true, deadline_ms: None }
    }

    pub fn with_policies(mut self, policies: Vec<PolicyId>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    /// `simulate` per spec §4.4: `evaluate` with `dryRun=true, trace=true`.
    pub fn simulate(context: ContextValue, policies: Vec<PolicyId>) -> Self {
        Self { context, policies, trace: true, dry_run: true, use_cache: false, deadline_ms: None }
    }

    fn deadline(&self) -> Duration {
        self.deadline_ms.map(Duration::from_millis).unwrap_or(DEFAULT_DEADLINE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub decision: Decision,
    pub allowed: bool,
    pub reason: Option<String>,
    pub matched_policies: Vec<PolicyId>,
    pub matched_rules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifications: Option<BTreeMap<String, ContextValue>>,
    pub evaluation_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, ContextValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<RuleTrace>,
}

/// Multi-policy aggregation engine. Cheap to clone: state lives behind
/// `Arc`-wrapped concurrent structures, matching the fleet-wide engine
/// sharing pattern used elsewhere in this workspace.
#[derive(Clone)]
pub struct PolicyEngine {
    active: Arc<DashMap<PolicyId, Policy>>,
    /// Insertion order, used only to break priority ties deterministically;
    /// `DashMap` iteration order is unspecified.
    insertion_order: Arc<RwLock<Vec<PolicyId>>>,
    cost_estimator: Arc<CostEstimator>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn builder() -> PolicyEngineBuilder {
        PolicyEngineBuilder::new()
    }

    pub fn new() -> Self {
        Self {
            active: Arc::new(DashMap::new()),
            insertion_order: Arc::new(RwLock::new(Vec::new())),
            cost_estimator: Arc::new(CostEstimator::with_default_pricing()),
        }
    }

    pub fn with_cost_estimator(cost_estimator: CostEstimator) -> Self {
        Self {
            active: Arc::new(DashMap::new()),
            insertion_order: Arc::new(RwLock::new(Vec::new())),
            cost_estimator: Arc::new(cost_estimator),
        }
    }

    /// No-op if `policy` is not `active` - only active policies ever enter
    /// the engine's view.
    pub fn add(&self, policy: Policy) {
        if !policy.is_active() {
            return;
        }
        let id = policy.id().to_string();
        if self.active.insert(id.clone(), policy).is_none() {
            self.insertion_order.write().push(id);
        }
    }

    pub fn remove(&self, id: &str) {
        if self.active.remove(id).is_some() {
            self.insertion_order.write().retain(|existing| existing != id);
        }
    }

    /// Unconditional put: removes the entry when the replacement is no
    /// longer active, otherwise upserts it.
    pub fn update(&self, policy: Policy) {
        if !policy.is_active() {
            self.remove(policy.id());
            return;
        }
        self.add(policy);
    }

    pub fn list(&self) -> Vec<Policy> {
        self.ordered_snapshot()
    }

    /// Returns policies in `priority` descending order, breaking ties by
    /// insertion order (a stable sort over the insertion-ordered snapshot
    /// achieves both in one step).
    fn ordered_snapshot(&self) -> Vec<Policy> {
        let order = self.insertion_order.read();
        let mut policies: Vec<Policy> = order
            .iter()
            .filter_map(|id| self.active.get(id).map(|entry| entry.value().clone()))
            .collect();
        policies.sort_by(|a, b| b.priority().cmp(&a.priority()));
        policies
    }

    fn select_policies(&self, requested: &[PolicyId]) -> Vec<Policy> {
        if requested.is_empty() {
            return self.ordered_snapshot();
        }
        let order = self.insertion_order.read();
        let mut policies: Vec<Policy> = order
            .iter()
            .filter(|id| requested.contains(id))
            .filter_map(|id| self.active.get(id).map(|entry| entry.value().clone()))
            .collect();
        policies.sort_by(|a, b| b.priority().cmp(&a.priority()));
        policies
    }

    #[instrument(skip_all, fields(trace = req.trace, dry_run = req.dry_run))]
    pub fn evaluate(&self, req: &EvaluationRequest) -> Result<PolicyDecision> {
        let start = Instant::now();
        let deadline = req.deadline();
        let enriched = enrich(&req.context, &self.cost_estimator);
        let policy_set = self.select_policies(&req.policies);

        let mut final_decision = Decision::Allow;
        let mut reason: Option<String> = None;
        let mut modifications: BTreeMap<String, ContextValue> = BTreeMap::new();
        let mut matched_policies: Vec<PolicyId> = Vec::new();
        let mut matched_rules: Vec<String> = Vec::new();
        let mut traces: Vec<RuleTrace> = Vec::new();

        'outer: for policy in &policy_set {
            if start.elapsed() > deadline {
                return Err(ReaperError::TimeoutError { elapsed_ms: start.elapsed().as_millis() as u64 });
            }

            let mut policy_matched = false;

            for rule in &policy.rules {
                if start.elapsed() > deadline {
                    return Err(ReaperError::TimeoutError { elapsed_ms: start.elapsed().as_millis() as u64 });
                }

                if !rule.enabled {
                    continue;
                }

                let evaluation = condition::evaluate(&rule.condition, &enriched)?;

                if req.trace {
                    traces.push(RuleTrace {
                        policy_id: policy.id().to_string(),
                        rule_id: rule.id.clone(),
                        condition_result: evaluation.result,
                        evaluation_time_ms: evaluation.evaluation_time_ms,
                        final_decision: rule.action.decision,
                        timestamp: Utc::now(),
                    });
                }

                if !evaluation.result {
                    continue;
                }

                policy_matched = true;
                if !matched_rules.contains(&rule.id) {
                    matched_rules.push(rule.id.clone());
                }

                match rule.action.decision {
                    Decision::Deny => {
                        final_decision = Decision::Deny;
                        reason = rule.action.reason.clone();
                        let id = policy.id().to_string();
                        if !matched_policies.contains(&id) {
                            matched_policies.push(id);
                        }
                        break 'outer;
                    }
                    Decision::Modify => {
                        if final_decision != Decision::Deny {
                            final_decision = Decision::Modify;
                            reason = rule.action.reason.clone();
                            if let Some(mods) = &rule.action.modifications {
                                for (path, value) in mods {
                                    modifications.insert(path.clone(), value.clone());
                                }
                            }
                        }
                    }
                    Decision::Warn => {
                        if final_decision == Decision::Allow {
                            final_decision = Decision::Warn;
                            reason = rule.action.reason.clone();
                        }
                    }
                    Decision::Allow => {}
                }
            }

            if policy_matched {
                let id = policy.id().to_string();
                if !matched_policies.contains(&id) {
                    matched_policies.push(id);
                }
            }
        }

        let evaluation_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(PolicyDecision {
            decision: final_decision,
            allowed: final_decision != Decision::Deny,
            reason,
            matched_policies,
            matched_rules,
            modifications: if modifications.is_empty() { None } else { Some(modifications) },
            evaluation_time_ms,
            metadata: None,
            trace: if req.trace { traces.into_iter().next() } else { None },
        })
    }

    /// `simulate` is evaluation with `dryRun=true, trace=true`; whether the
    /// result is audited or cached is a caller (C9) concern, not this one.
    pub fn simulate(&self, context: ContextValue, policies: Vec<PolicyId>) -> Result<PolicyDecision> {
        self.evaluate(&EvaluationRequest::simulate(context, policies))
    }

    /// A snapshot summary for `/metrics`-style endpoints. Cache and audit
    /// stats are a caller concern (C6/C8 live outside this crate); this only
    /// reports what the engine itself knows.
    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics { policy_count: self.active.len() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub policy_count: usize,
}

/// Fluent construction for an engine preloaded with policies and/or a
/// non-default cost estimator, for callers that don't need the bare
/// `new()` + repeated `add()` calls.
#[derive(Default)]
pub struct PolicyEngineBuilder {
    policies: Vec<Policy>,
    cost_estimator: Option<CostEstimator>,
}

impl PolicyEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn with_policies(mut self, policies: impl IntoIterator<Item = Policy>) -> Self {
        self.policies.extend(policies);
        self
    }

    pub fn with_cost_estimator(mut self, cost_estimator: CostEstimator) -> Self {
        self.cost_estimator = Some(cost_estimator);
        self
    }

    pub fn build(self) -> PolicyEngine {
        let engine = match self.cost_estimator {
            Some(estimator) => PolicyEngine::with_cost_estimator(estimator),
            None => PolicyEngine::new(),
        };
        for policy in self.policies {
            engine.add(policy);
        }
        engine
    }
}

/// Overlays derived fields onto a copy of `ctx`; never mutates the caller's
/// context. Idempotent: re-enriching an already-enriched context recomputes
/// the same derived values from the same `llm.prompt`.
fn enrich(ctx: &ContextValue, cost_estimator: &CostEstimator) -> ContextValue {
    let mut top = ctx.as_map().cloned().unwrap_or_default();

    let Some(mut llm) = top.get("llm").and_then(|v| v.as_map()).cloned() else {
        return ContextValue::Map(top);
    };

    let Some(prompt) = llm.get("prompt").and_then(|v| v.as_str()).map(str::to_string) else {
        top.insert("llm".to_string(), ContextValue::Map(llm));
        return ContextValue::Map(top);
    };

    let model = llm.get("model").and_then(|v| v.as_str()).map(str::to_string);
    let estimate = primitives::estimate_tokens(&prompt, model.as_deref());
    llm.insert("estimatedTokens".to_string(), ContextValue::Number(estimate.tokens as f64));

    let pii_matches = primitives::detect_pii(&prompt);
    llm.insert("containsPII".to_string(), ContextValue::Bool(!pii_matches.is_empty()));
    let mut seen_types = BTreeSet::new();
    let pii_types: Vec<ContextValue> = pii_matches
        .iter()
        .filter(|m| seen_types.insert(m.pii_type.label()))
        .map(|m| ContextValue::String(m.pii_type.label().to_string()))
        .collect();
    llm.insert("piiTypes".to_string(), ContextValue::List(pii_types));

    if let (Some(provider), Some(model)) = (llm.get("provider").and_then(|v| v.as_str()).map(str::to_string), model) {
        let cost = cost_estimator.estimate(&provider, &model, estimate.tokens, 500);
        llm.insert("estimatedCost".to_string(), ContextValue::Number(cost.total_cost));
    }

    top.insert("llm".to_string(), ContextValue::Map(llm));
    ContextValue::Map(top)
}
