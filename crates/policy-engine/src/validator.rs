//! Structural schema validation (C3).
//!
//! Unlike the parser, the validator never fails the call itself - it always
//! returns a `ValidationResult` describing what, if anything, is wrong.

use crate::condition::{Condition, Operator};
use crate::model::{Decision, Policy, PolicyRule};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }
}

pub fn validate(policy: &Policy) -> ValidationResult {
    let mut errors = Vec::new();

    if policy.metadata.id.trim().is_empty() {
        errors.push("metadata.id is required".to_string());
    }
    if policy.metadata.name.trim().is_empty() {
        errors.push("metadata.name is required".to_string());
    }
    if policy.metadata.version.trim().is_empty() {
        errors.push("metadata.version is required".to_string());
    }
    if policy.metadata.namespace.trim().is_empty() {
        errors.push("metadata.namespace is required".to_string());
    }

    for rule in &policy.rules {
        validate_rule(rule, &mut errors);
    }

    ValidationResult::from_errors(errors)
}

fn validate_rule(rule: &PolicyRule, errors: &mut Vec<String>) {
    if rule.id.trim().is_empty() {
        errors.push("rule id is required".to_string());
    }

    validate_condition(&rule.condition, &rule.id, errors);

    match (rule.action.decision, &rule.action.modifications) {
        (Decision::Modify, None) => {
            errors.push(format!("rule '{}': modify action requires modifications", rule.id));
        }
        (d, Some(_)) if d != Decision::Modify => {
            errors.push(format!(
                "rule '{}': modifications are only permitted when decision = modify",
                rule.id
            ));
        }
        _ => {}
    }
}

fn validate_condition(condition: &Condition, rule_id: &str, errors: &mut Vec<String>) {
    match &condition.operator {
        Operator::Unknown(op) => {
            errors.push(format!("rule '{rule_id}': unknown operator '{op}'"));
        }
        Operator::And | Operator::Or | Operator::Not => {
            if condition.field.is_some() || condition.value.is_some() {
                errors.push(format!(
                    "rule '{rule_id}': logical operator '{:?}' must not carry field/value",
                    condition.operator
                ));
            }
            if condition.operator == Operator::Not && condition.conditions.len() != 1 {
                errors.push(format!("rule '{rule_id}': 'not' must carry exactly one child condition"));
            }
            for child in &condition.conditions {
                validate_condition(child, rule_id, errors);
            }
        }
        _ => {
            if condition.field.is_none() {
                errors.push(format!(
                    "rule '{rule_id}': comparison operator '{:?}' requires a field",
                    condition.operator
                ));
            }
            if !condition.conditions.is_empty() {
                errors.push(format!(
                    "rule '{rule_id}': comparison operator '{:?}' must not carry child conditions",
                    condition.operator
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, PolicyMetadata, PolicyStatus};

    fn base_policy() -> Policy {
        Policy {
            metadata: PolicyMetadata {
                id: "p1".to_string(),
                name: "n".to_string(),
                version: "1.0.0".to_string(),
                namespace: "default".to_string(),
                description: None,
                tags: vec![],
                priority: 0,
                created_at: None,
                updated_at: None,
                created_by: None,
            },
            rules: vec![],
            status: PolicyStatus::Active,
        }
    }

    #[test]
    fn empty_policy_with_valid_metadata_is_valid() {
        let result = validate(&base_policy());
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn missing_metadata_fields_are_flagged() {
        let mut policy = base_policy();
        policy.metadata.id = "".to_string();
        let result = validate(&policy);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("metadata.id")));
    }

    #[test]
    fn logical_node_with_field_is_invalid() {
        let mut policy = base_policy();
        policy.rules.push(PolicyRule {
            id: "r1".to_string(),
            name: "r".to_string(),
            condition: Condition { operator: Operator::And, conditions: vec![], field: Some("x".into()), value: None },
            action: Action::allow(),
            enabled: true,
            description: None,
        });
        let result = validate(&policy);
        assert!(!result.valid);
    }

    #[test]
    fn comparison_node_missing_field_is_invalid() {
        let mut policy = base_policy();
        policy.rules.push(PolicyRule {
            id: "r1".to_string(),
            name: "r".to_string(),
            condition: Condition { operator: Operator::Eq, conditions: vec![], field: None, value: None },
            action: Action::allow(),
            enabled: true,
            description: None,
        });
        let result = validate(&policy);
        assert!(!result.valid);
    }

    #[test]
    fn modify_action_without_modifications_is_invalid() {
        let mut policy = base_policy();
        policy.rules.push(PolicyRule {
            id: "r1".to_string(),
            name: "r".to_string(),
            condition: Condition::eq("llm.model", "gpt-4"),
            action: Action { decision: Decision::Modify, reason: None, modifications: None, metadata: None },
            enabled: true,
            description: None,
        });
        let result = validate(&policy);
        assert!(!result.valid);
    }

    #[test]
    fn unknown_operator_is_invalid() {
        let mut policy = base_policy();
        policy.rules.push(PolicyRule {
            id: "r1".to_string(),
            name: "r".to_string(),
            condition: Condition { operator: Operator::Unknown("bogus".into()), conditions: vec![], field: Some("x".into()), value: None },
            action: Action::allow(),
            enabled: true,
            description: None,
        });
        let result = validate(&policy);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("bogus")));
    }
}
