//! Per-rule evaluation trace entries, emitted only when a request opts in.

use crate::model::Decision;
use chrono::{DateTime, Utc};
use reaper_core::PolicyId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTrace {
    pub policy_id: PolicyId,
    pub rule_id: String,
    pub condition_result: bool,
    pub evaluation_time_ms: f64,
    pub final_decision: Decision,
    pub timestamp: DateTime<Utc>,
}
