//! Policy document parsing (C2): YAML or JSON into a [`Policy`] with
//! defaults filled in. Both input forms are interchangeable, since both are
//! first normalized into a `serde_json::Value` before the same default-
//! filling and typed deserialization path runs.

use crate::model::Policy;
use reaper_core::{ReaperError, Result};
use serde_json::{Map, Value};

pub fn parse_yaml(input: &str) -> Result<Policy> {
    let value: Value = serde_yaml::from_str(input)
        .map_err(|e| ReaperError::ParseError { reason: format!("invalid YAML: {e}") })?;
    parse_value(value)
}

pub fn parse_json(input: &str) -> Result<Policy> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| ReaperError::ParseError { reason: format!("invalid JSON: {e}") })?;
    parse_value(value)
}

fn parse_value(value: Value) -> Result<Policy> {
    if value.is_null() {
        return Err(ReaperError::ParseError { reason: "document is empty".to_string() });
    }

    let mut obj: Map<String, Value> = match value {
        Value::Object(obj) => obj,
        _ => return Err(ReaperError::ParseError { reason: "document must be a mapping".to_string() }),
    };

    if !obj.contains_key("metadata") {
        return Err(ReaperError::ParseError { reason: "document is missing metadata".to_string() });
    }

    let rules = obj
        .get_mut("rules")
        .ok_or_else(|| ReaperError::ParseError { reason: "document is missing a rule array".to_string() })?;
    let rules_arr = rules
        .as_array_mut()
        .ok_or_else(|| ReaperError::ParseError { reason: "rules must be an array".to_string() })?;

    for (index, rule) in rules_arr.iter_mut().enumerate() {
        let rule_obj = rule
            .as_object_mut()
            .ok_or_else(|| ReaperError::ParseError { reason: format!("rule at index {index} must be a mapping") })?;
        rule_obj
            .entry("id".to_string())
            .or_insert_with(|| Value::String(format!("rule-{index}")));
        rule_obj
            .entry("name".to_string())
            .or_insert_with(|| Value::String(format!("Rule {index}")));
        rule_obj
            .entry("enabled".to_string())
            .or_insert_with(|| Value::Bool(true));
    }

    obj.entry("status".to_string())
        .or_insert_with(|| Value::String("active".to_string()));

    serde_json::from_value(Value::Object(obj))
        .map_err(|e| ReaperError::ParseError { reason: format!("document does not match the policy schema: {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PolicyStatus;

    const JSON_DOC: &str = r#"{
        "metadata": {"id": "p1", "name": "Test Policy"},
        "rules": [
            {"condition": {"operator": "eq", "field": "llm.model", "value": "gpt-4"},
             "action": {"decision": "deny"}}
        ]
    }"#;

    #[test]
    fn empty_document_is_a_parse_error() {
        assert!(parse_json("null").is_err());
        assert!(parse_yaml("").is_err());
    }

    #[test]
    fn missing_metadata_is_a_parse_error() {
        let doc = r#"{"rules": []}"#;
        let err = parse_json(doc).unwrap_err();
        assert!(err.to_string().contains("metadata"));
    }

    #[test]
    fn missing_rules_is_a_parse_error() {
        let doc = r#"{"metadata": {"id": "p1", "name": "n"}}"#;
        let err = parse_json(doc).unwrap_err();
        assert!(err.to_string().contains("rule"));
    }

    #[test]
    fn defaults_are_filled_in() {
        let policy = parse_json(JSON_DOC).unwrap();
        assert_eq!(policy.metadata.version, "1.0.0");
        assert_eq!(policy.metadata.namespace, "default");
        assert_eq!(policy.metadata.priority, 0);
        assert!(policy.metadata.tags.is_empty());
        assert_eq!(policy.status, PolicyStatus::Active);

        let rule = &policy.rules[0];
        assert_eq!(rule.id, "rule-0");
        assert_eq!(rule.name, "Rule 0");
        assert!(rule.enabled);
    }

    #[test]
    fn yaml_and_json_forms_are_interchangeable() {
        let yaml_doc = r#"
metadata:
  id: p1
  name: Test Policy
rules:
  - condition:
      operator: eq
      field: llm.model
      value: gpt-4
    action:
      decision: deny
"#;
        let from_yaml = parse_yaml(yaml_doc).unwrap();
        let from_json = parse_json(JSON_DOC).unwrap();
        assert_eq!(from_yaml.metadata.id, from_json.metadata.id);
        assert_eq!(from_yaml.rules.len(), from_json.rules.len());
    }

    #[test]
    fn explicit_rule_fields_are_preserved() {
        let doc = r#"{
            "metadata": {"id": "p1", "name": "n"},
            "rules": [{"id": "custom", "name": "Custom", "enabled": false,
                       "condition": {"operator": "and", "conditions": []},
                       "action": {"decision": "allow"}}]
        }"#;
        let policy = parse_json(doc).unwrap();
        assert_eq!(policy.rules[0].id, "custom");
        assert!(!policy.rules[0].enabled);
    }
}
