//! The open, dynamically-typed evaluation context tree.
//!
//! The policy engine must not reflect on language-native types: every value
//! that flows through condition evaluation, enrichment, and caching is a
//! `ContextValue`. This mirrors a JSON value but keeps map ordering
//! deterministic (`BTreeMap`) so canonical serialization for cache
//! fingerprints is stable without an extra sort pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ContextValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    pub fn map() -> Self {
        ContextValue::Map(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ContextValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ContextValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ContextValue]> {
        match self {
            ContextValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            ContextValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ContextValue::Null)
    }

    /// Coerces the value to a display string, used by comparison operators
    /// that fall back to string comparison.
    pub fn coerce_to_string(&self) -> String {
        match self {
            ContextValue::Null => String::new(),
            ContextValue::Bool(b) => b.to_string(),
            ContextValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            ContextValue::String(s) => s.clone(),
            ContextValue::List(_) | ContextValue::Map(_) => self.canonical_json(),
        }
    }

    /// Canonical JSON serialization, used for structural equality and for
    /// the cache fingerprint. `BTreeMap` already orders keys, so
    /// `serde_json::to_string` over this tree is canonical by construction.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Looks up a dot/bracket path into this tree.
    ///
    /// Supports `a.b.c`, `a[0]`, and `a.b[2].c` forms. A missing segment at
    /// any point yields `None` (the spec's "undefined").
    pub fn lookup(&self, path: &str) -> Option<&ContextValue> {
        let mut current = self;
        for segment in split_path(path) {
            current = match segment {
                PathSegment::Key(key) => current.as_map()?.get(&key)?,
                PathSegment::Index(idx) => current.as_list()?.get(idx)?,
            };
        }
        Some(current)
    }

    /// `lookup` plus `as_str`, owned - the common case for pulling an
    /// optional scope id (`user.id`, `team.id`, ...) out of a request
    /// context for audit purposes.
    pub fn lookup_str(&self, path: &str) -> Option<String> {
        self.lookup(path).and_then(ContextValue::as_str).map(str::to_string)
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coerce_to_string())
    }
}

enum PathSegment {
    Key(String),
    Index(usize),
}

/// Splits `a.b[2].c["d"]` into ordered segments. Unknown/malformed bracket
/// contents are treated as a literal key segment rather than erroring, since
/// the spec defines a missing path as simply "undefined", never an error.
fn split_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut buf = String::new();

    let flush = |buf: &mut String, segments: &mut Vec<PathSegment>| {
        if !buf.is_empty() {
            segments.push(PathSegment::Key(std::mem::take(buf)));
        }
    };

    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => flush(&mut buf, &mut segments),
            '[' => {
                flush(&mut buf, &mut segments);
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let trimmed = inner.trim_matches(|c| c == '\'' || c == '"');
                match trimmed.parse::<usize>() {
                    Ok(idx) => segments.push(PathSegment::Index(idx)),
                    Err(_) => segments.push(PathSegment::Key(trimmed.to_string())),
                }
            }
            _ => buf.push(c),
        }
    }
    flush(&mut buf, &mut segments);
    segments
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ContextValue::Null,
            serde_json::Value::Bool(b) => ContextValue::Bool(b),
            serde_json::Value::Number(n) => ContextValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => ContextValue::String(s),
            serde_json::Value::Array(a) => {
                ContextValue::List(a.into_iter().map(ContextValue::from).collect())
            }
            serde_json::Value::Object(o) => ContextValue::Map(
                o.into_iter()
                    .map(|(k, v)| (k, ContextValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ContextValue> for serde_json::Value {
    fn from(value: ContextValue) -> Self {
        match value {
            ContextValue::Null => serde_json::Value::Null,
            ContextValue::Bool(b) => serde_json::Value::Bool(b),
            ContextValue::Number(n) => serde_json::json!(n),
            ContextValue::String(s) => serde_json::Value::String(s),
            ContextValue::List(l) => {
                serde_json::Value::Array(l.into_iter().map(Into::into).collect())
            }
            ContextValue::Map(m) => serde_json::Value::Object(
                m.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Number(value as f64)
    }
}
