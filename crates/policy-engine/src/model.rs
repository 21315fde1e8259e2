//! The policy data model: metadata, rules, actions, and status.

use crate::condition::Condition;
use chrono::{DateTime, Utc};
use reaper_core::{ContextValue, RuleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Active,
    Draft,
    Deprecated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
    Warn,
    Modify,
}

impl Decision {
    /// Total order used for aggregation precedence: deny > modify > warn > allow.
    fn rank(self) -> u8 {
        match self {
            Decision::Deny => 3,
            Decision::Modify => 2,
            Decision::Warn => 1,
            Decision::Allow => 0,
        }
    }

    pub fn outranks(self, other: Decision) -> bool {
        self.rank() > other.rank()
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::Warn => "warn",
            Decision::Modify => "modify",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

impl PolicyMetadata {
    /// The durable uniqueness key: `(namespace, name, version)`.
    pub fn uniqueness_key(&self) -> (String, String, String) {
        (self.namespace.clone(), self.name.clone(), self.version.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub decision: Decision,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub modifications: Option<BTreeMap<String, ContextValue>>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, ContextValue>>,
}

impl Action {
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            reason: None,
            modifications: None,
            metadata: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Deny,
            reason: Some(reason.into()),
            modifications: None,
            metadata: None,
        }
    }

    pub fn warn(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Warn,
            reason: Some(reason.into()),
            modifications: None,
            metadata: None,
        }
    }

    pub fn modify(reason: impl Into<String>, modifications: BTreeMap<String, ContextValue>) -> Self {
        Self {
            decision: Decision::Modify,
            reason: Some(reason.into()),
            modifications: Some(modifications),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: RuleId,
    pub name: String,
    pub condition: Condition,
    pub action: Action,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub metadata: PolicyMetadata,
    pub rules: Vec<PolicyRule>,
    #[serde(default = "default_active")]
    pub status: PolicyStatus,
}

fn default_active() -> PolicyStatus {
    PolicyStatus::Active
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn priority(&self) -> i64 {
        self.metadata.priority
    }
}
