//! Policy evaluation engine for LLM requests: document parsing, schema
//! validation, condition evaluation, context enrichment primitives, and
//! multi-policy aggregation.

pub use reaper_core;

pub mod condition;
pub mod engine;
pub mod model;
pub mod parser;
pub mod primitives;
pub mod trace;
pub mod validator;

pub use condition::{evaluate as evaluate_condition, Condition, ConditionEvaluation, Operator};
pub use engine::{EngineMetrics, EvaluationRequest, PolicyDecision, PolicyEngine, PolicyEngineBuilder};
pub use model::{Action, Decision, Policy, PolicyMetadata, PolicyRule, PolicyStatus};
pub use parser::{parse_json, parse_yaml};
pub use trace::RuleTrace;
pub use validator::{validate, ValidationResult};

pub use reaper_core::{ContextValue, PolicyId, ReaperError, Result};
