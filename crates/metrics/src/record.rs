//! `EvaluationRecord`: the immutable audit row written for every non-dry-run
//! evaluation.

use chrono::{DateTime, Utc};
use policy_engine::{Decision, PolicyDecision};
use reaper_core::{ContextValue, PolicyId, RecordId, RequestId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: RecordId,
    pub request_id: RequestId,
    pub policy_ids: Vec<PolicyId>,
    pub decision: Decision,
    pub allowed: bool,
    pub reason: Option<String>,
    pub matched_policies: Vec<PolicyId>,
    pub matched_rules: Vec<String>,
    pub context: ContextValue,
    pub evaluation_time_ms: f64,
    pub cached: bool,
    pub created_at: DateTime<Utc>,
    pub namespace: Option<String>,
    pub user_id: Option<String>,
    pub team_id: Option<String>,
    pub project_id: Option<String>,
}

impl EvaluationRecord {
    /// Builds a record from a completed decision. `policy_ids` is the
    /// requested set (possibly empty, meaning "all active"), distinct from
    /// `decision.matched_policies`, the subset that actually contributed.
    pub fn new(
        request_id: RequestId,
        policy_ids: Vec<PolicyId>,
        context: ContextValue,
        decision: &PolicyDecision,
        cached: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new_v4(),
            request_id,
            policy_ids,
            decision: decision.decision,
            allowed: decision.allowed,
            reason: decision.reason.clone(),
            matched_policies: decision.matched_policies.clone(),
            matched_rules: decision.matched_rules.clone(),
            context,
            evaluation_time_ms: decision.evaluation_time_ms,
            cached,
            created_at,
            namespace: None,
            user_id: None,
            team_id: None,
            project_id: None,
        }
    }

    /// Attaches the optional scope ids spec.md §3/§6 list alongside
    /// `user_id` - `namespace` mirrors the owning policy's namespace,
    /// `team_id`/`project_id` come from the request context when present.
    pub fn with_scope(
        mut self,
        namespace: Option<String>,
        user_id: Option<String>,
        team_id: Option<String>,
        project_id: Option<String>,
    ) -> Self {
        self.namespace = namespace;
        self.user_id = user_id;
        self.team_id = team_id;
        self.project_id = project_id;
        self
    }
}
