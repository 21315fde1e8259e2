//! The condition tree and its deterministic evaluator (C4).
//!
//! A `Condition` is a discriminated tree dispatched on its `operator` field
//! rather than on a Rust-level enum per node shape, per the design note
//! "operator dispatch -> tagged variant": one struct, one field that picks
//! the behavior, table-dispatched in `evaluate`.

use reaper_core::{ContextValue, ReaperError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    NotContains,
    Matches,
    /// An operator string outside the enumerated set. Structurally valid
    /// JSON/YAML still parses into this; it only fails at evaluation time,
    /// matching "unknown operator => evaluation error" rather than a parse
    /// failure.
    Unknown(String),
}

impl Operator {
    fn as_str(&self) -> &str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Matches => "matches",
            Operator::Unknown(s) => s,
        }
    }

    fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }
}

impl Serialize for Operator {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "and" => Operator::And,
            "or" => Operator::Or,
            "not" => Operator::Not,
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "contains" => Operator::Contains,
            "not_contains" => Operator::NotContains,
            "matches" => Operator::Matches,
            other => Operator::Unknown(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub operator: Operator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<ContextValue>,
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self { operator: Operator::And, conditions, field: None, value: None }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self { operator: Operator::Or, conditions, field: None, value: None }
    }

    pub fn not(condition: Condition) -> Self {
        Self { operator: Operator::Not, conditions: vec![condition], field: None, value: None }
    }

    fn comparison(operator: Operator, field: impl Into<String>, value: ContextValue) -> Self {
        Self { operator, conditions: Vec::new(), field: Some(field.into()), value: Some(value) }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Eq, field, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Ne, field, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Gt, field, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Gte, field, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Lt, field, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Lte, field, value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        Self::comparison(Operator::Contains, field, value.into())
    }

    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::comparison(Operator::Matches, field, ContextValue::String(pattern.into()))
    }

    pub fn is_logical(&self) -> bool {
        self.operator.is_logical()
    }
}

#[derive(Debug, Clone)]
pub struct ConditionEvaluation {
    pub result: bool,
    pub evaluation_time_ms: f64,
    pub details: Option<String>,
}

/// Evaluates a condition tree against a context. Pure and deterministic:
/// the only side effect is the wall-clock measurement reported back.
pub fn evaluate(condition: &Condition, ctx: &ContextValue) -> Result<ConditionEvaluation> {
    let start = Instant::now();
    let result = eval_node(condition, ctx);
    let evaluation_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(result) => Ok(ConditionEvaluation {
            result,
            evaluation_time_ms,
            details: Some(condition.operator.as_str().to_string()),
        }),
        Err(e) => Err(e),
    }
}

fn eval_node(condition: &Condition, ctx: &ContextValue) -> Result<bool> {
    match &condition.operator {
        Operator::And => {
            for child in &condition.conditions {
                if !eval_node(child, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Operator::Or => {
            for child in &condition.conditions {
                if eval_node(child, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Operator::Not => match condition.conditions.first() {
            Some(child) => Ok(!eval_node(child, ctx)?),
            None => Ok(true),
        },
        Operator::Eq => Ok(values_equal(lookup(condition, ctx), condition.value.as_ref())),
        Operator::Ne => Ok(!values_equal(lookup(condition, ctx), condition.value.as_ref())),
        Operator::Gt => Ok(compare(lookup(condition, ctx), condition.value.as_ref()) == Some(std::cmp::Ordering::Greater)),
        Operator::Gte => {
            let ord = compare(lookup(condition, ctx), condition.value.as_ref());
            Ok(ord == Some(std::cmp::Ordering::Greater) || ord == Some(std::cmp::Ordering::Equal))
        }
        Operator::Lt => Ok(compare(lookup(condition, ctx), condition.value.as_ref()) == Some(std::cmp::Ordering::Less)),
        Operator::Lte => {
            let ord = compare(lookup(condition, ctx), condition.value.as_ref());
            Ok(ord == Some(std::cmp::Ordering::Less) || ord == Some(std::cmp::Ordering::Equal))
        }
        Operator::In => Ok(eval_in(lookup(condition, ctx), condition.value.as_ref())),
        Operator::NotIn => Ok(!eval_in(lookup(condition, ctx), condition.value.as_ref())),
        Operator::Contains => Ok(eval_contains(lookup(condition, ctx), condition.value.as_ref())),
        Operator::NotContains => Ok(!eval_contains(lookup(condition, ctx), condition.value.as_ref())),
        Operator::Matches => Ok(eval_matches(lookup(condition, ctx), condition.value.as_ref())),
        Operator::Unknown(op) => Err(ReaperError::EvaluationError {
            reason: format!("unknown operator: {op}"),
        }),
    }
}

fn lookup<'a>(condition: &Condition, ctx: &'a ContextValue) -> Option<&'a ContextValue> {
    condition.field.as_ref().and_then(|path| ctx.lookup(path))
}

/// Equality per spec §4.3: both-absent is equal, structural for
/// objects/arrays via canonical JSON, string coercion otherwise.
fn values_equal(a: Option<&ContextValue>, b: Option<&ContextValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(ContextValue::Null), None) | (None, Some(ContextValue::Null)) => true,
        (Some(ContextValue::Null), Some(ContextValue::Null)) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(a), Some(b)) => match (a, b) {
            (ContextValue::List(_), _) | (_, ContextValue::List(_)) | (ContextValue::Map(_), _) | (_, ContextValue::Map(_)) => {
                a.canonical_json() == b.canonical_json()
            }
            _ => a.coerce_to_string() == b.coerce_to_string(),
        },
    }
}

/// Numeric-if-possible, else lexicographic string comparison.
fn compare(a: Option<&ContextValue>, b: Option<&ContextValue>) -> Option<std::cmp::Ordering> {
    let a = a.unwrap_or(&ContextValue::Null);
    let b = b.unwrap_or(&ContextValue::Null);

    match (finite_number(a), finite_number(b)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(a.coerce_to_string().cmp(&b.coerce_to_string())),
    }
}

fn finite_number(v: &ContextValue) -> Option<f64> {
    match v {
        ContextValue::Number(n) if n.is_finite() => Some(*n),
        ContextValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn eval_in(field_value: Option<&ContextValue>, rhs: Option<&ContextValue>) -> bool {
    let Some(ContextValue::List(items)) = rhs else {
        return false;
    };
    items.iter().any(|item| values_equal(field_value, Some(item)))
}

fn eval_contains(haystack: Option<&ContextValue>, needle: Option<&ContextValue>) -> bool {
    let Some(needle) = needle else { return false };
    match haystack {
        Some(ContextValue::String(s)) => s.contains(&needle.coerce_to_string()),
        Some(ContextValue::List(items)) => items.iter().any(|item| values_equal(Some(item), Some(needle))),
        Some(ContextValue::Map(map)) => map.values().any(|v| values_equal(Some(v), Some(needle))),
        _ => false,
    }
}

fn eval_matches(field_value: Option<&ContextValue>, pattern: Option<&ContextValue>) -> bool {
    let Some(pattern) = pattern.and_then(|v| v.as_str()) else {
        return false;
    };
    let Ok(re) = Regex::new(pattern) else {
        return false;
    };
    let Some(field_value) = field_value else { return false };
    re.is_match(&field_value.coerce_to_string())
}
