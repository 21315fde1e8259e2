//! The policy store (C7): durable key/value over policies. The platform
//! owns this - it is the sole writer of durable policy state and the
//! authority `policy-engine`'s in-process snapshot defers to.

use chrono::Utc;
use dashmap::DashMap;
use policy_engine::{Policy, PolicyMetadata, PolicyRule, PolicyStatus};
use reaper_core::{PolicyId, ReaperError, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A partial update: `None` leaves the field untouched. `rules` and
/// `status`, when present, replace the existing value wholesale rather
/// than merging - only the metadata subtree is merged field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPatch {
    pub name: Option<String>,
    pub version: Option<String>,
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<i64>,
    pub created_by: Option<String>,
    pub rules: Option<Vec<PolicyRule>>,
    pub status: Option<PolicyStatus>,
}

struct Entry {
    policy: Policy,
    sequence: u64,
}

/// In-process stand-in for a durable store (a real deployment backs this
/// with a database table). Insertion order is tracked alongside
/// `created_at` so ties in `findActive`'s ordering stay deterministic even
/// when timestamps collide.
#[derive(Default)]
pub struct PolicyStore {
    entries: DashMap<PolicyId, Entry>,
    sequence: AtomicU64,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Rejects a policy whose `(namespace, name, version)` already belongs
    /// to a different id.
    fn conflicts(&self, policy: &Policy) -> bool {
        let key = policy.metadata.uniqueness_key();
        self.entries.iter().any(|e| {
            e.policy.metadata.id != policy.metadata.id && e.policy.metadata.uniqueness_key() == key
        })
    }

    pub fn create(&self, mut policy: Policy, actor: Option<String>) -> Result<Policy> {
        if self.entries.contains_key(&policy.metadata.id) {
            return Err(ReaperError::ConflictError {
                reason: format!("policy id '{}' already exists", policy.metadata.id),
            });
        }
        if self.conflicts(&policy) {
            return Err(ReaperError::ConflictError {
                reason: format!(
                    "a policy with namespace/name/version {:?} already exists",
                    policy.metadata.uniqueness_key()
                ),
            });
        }
        let now = Utc::now();
        policy.metadata.created_at.get_or_insert(now);
        policy.metadata.updated_at = Some(now);
        if policy.metadata.created_by.is_none() {
            policy.metadata.created_by = actor;
        }
        let sequence = self.next_sequence();
        let id = policy.metadata.id.clone();
        self.entries.insert(id, Entry { policy: policy.clone(), sequence });
        Ok(policy)
    }

    pub fn find_by_id(&self, id: &str) -> Option<Policy> {
        self.entries.get(id).map(|e| e.policy.clone())
    }

    /// Ordered by priority desc, then creation time desc (insertion
    /// sequence breaks ties), per spec.
    pub fn find_active(&self) -> Vec<Policy> {
        self.ordered(|p| p.status == PolicyStatus::Active)
    }

    pub fn find_by_namespace(&self, namespace: &str) -> Vec<Policy> {
        self.ordered(|p| p.metadata.namespace == namespace)
    }

    fn ordered(&self, predicate: impl Fn(&Policy) -> bool) -> Vec<Policy> {
        let mut matching: Vec<(Policy, u64)> = self
            .entries
            .iter()
            .filter(|e| predicate(&e.policy))
            .map(|e| (e.policy.clone(), e.sequence))
            .collect();
        matching.sort_by(|(a, a_seq), (b, b_seq)| {
            b.metadata
                .priority
                .cmp(&a.metadata.priority)
                .then_with(|| b.metadata.created_at.cmp(&a.metadata.created_at))
                .then_with(|| b_seq.cmp(a_seq))
        });
        matching.into_iter().map(|(p, _)| p).collect()
    }

    /// Merges the metadata subtree field by field; `rules`/`status`
    /// overwrite wholesale when present in the patch.
    pub fn update(&self, id: &str, patch: PolicyPatch) -> Result<Policy> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.to_string() })?;

        let metadata = &mut entry.policy.metadata;
        if let Some(name) = patch.name {
            metadata.name = name;
        }
        if let Some(version) = patch.version {
            metadata.version = version;
        }
        if let Some(namespace) = patch.namespace {
            metadata.namespace = namespace;
        }
        if let Some(description) = patch.description {
            metadata.description = Some(description);
        }
        if let Some(tags) = patch.tags {
            metadata.tags = tags;
        }
        if let Some(priority) = patch.priority {
            metadata.priority = priority;
        }
        if let Some(created_by) = patch.created_by {
            metadata.created_by = Some(created_by);
        }
        metadata.updated_at = Some(Utc::now());

        if let Some(rules) = patch.rules {
            entry.policy.rules = rules;
        }
        if let Some(status) = patch.status {
            entry.policy.status = status;
        }

        Ok(entry.policy.clone())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.entries
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_engine::{Action, Condition};

    fn policy(id: &str, namespace: &str, priority: i64) -> Policy {
        Policy {
            metadata: PolicyMetadata {
                id: id.to_string(),
                name: id.to_string(),
                version: "1.0.0".to_string(),
                namespace: namespace.to_string(),
                description: None,
                tags: vec![],
                priority,
                created_at: None,
                updated_at: None,
                created_by: None,
            },
            rules: vec![],
            status: PolicyStatus::Active,
        }
    }

    #[test]
    fn create_then_find_by_id_round_trips() {
        let store = PolicyStore::new();
        store.create(policy("p1", "default", 0), None).unwrap();
        assert!(store.find_by_id("p1").is_some());
        assert!(store.find_by_id("missing").is_none());
    }

    #[test]
    fn duplicate_id_is_a_conflict() {
        let store = PolicyStore::new();
        store.create(policy("p1", "default", 0), None).unwrap();
        let err = store.create(policy("p1", "default", 0), None).unwrap_err();
        assert!(matches!(err, ReaperError::ConflictError { .. }));
    }

    #[test]
    fn duplicate_uniqueness_key_with_different_id_is_a_conflict() {
        let store = PolicyStore::new();
        store.create(policy("p1", "default", 0), None).unwrap();
        let err = store.create(policy("p2", "default", 0), None).unwrap_err();
        assert!(matches!(err, ReaperError::ConflictError { .. }));
    }

    #[test]
    fn find_active_orders_by_priority_desc_then_creation_desc() {
        let store = PolicyStore::new();
        store.create(policy("low", "default", 1), None).unwrap();
        store.create(policy("high", "default", 10), None).unwrap();
        store.create(policy("mid", "default", 5), None).unwrap();
        let ids: Vec<String> = store.find_active().iter().map(|p| p.metadata.id.clone()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn find_active_excludes_non_active_status() {
        let store = PolicyStore::new();
        let mut draft = policy("p1", "default", 0);
        draft.status = PolicyStatus::Draft;
        store.create(draft, None).unwrap();
        assert!(store.find_active().is_empty());
    }

    #[test]
    fn find_by_namespace_filters() {
        let store = PolicyStore::new();
        store.create(policy("p1", "team-a", 0), None).unwrap();
        store.create(policy("p2", "team-b", 0), None).unwrap();
        assert_eq!(store.find_by_namespace("team-a").len(), 1);
    }

    #[test]
    fn update_merges_metadata_and_overwrites_rules() {
        let store = PolicyStore::new();
        store.create(policy("p1", "default", 0), None).unwrap();
        let updated = store
            .update(
                "p1",
                PolicyPatch {
                    priority: Some(42),
                    rules: Some(vec![PolicyRule {
                        id: "r1".to_string(),
                        name: "r1".to_string(),
                        condition: Condition::eq("llm.model", "gpt-4"),
                        action: Action::allow(),
                        enabled: true,
                        description: None,
                    }]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.metadata.priority, 42);
        assert_eq!(updated.metadata.name, "p1");
        assert_eq!(updated.rules.len(), 1);
    }

    #[test]
    fn update_missing_id_is_policy_not_found() {
        let store = PolicyStore::new();
        let err = store.update("missing", PolicyPatch::default()).unwrap_err();
        assert!(matches!(err, ReaperError::PolicyNotFound { .. }));
    }

    #[test]
    fn delete_missing_id_is_policy_not_found() {
        let store = PolicyStore::new();
        let err = store.delete("missing").unwrap_err();
        assert!(matches!(err, ReaperError::PolicyNotFound { .. }));
    }

    #[test]
    fn delete_removes_the_policy() {
        let store = PolicyStore::new();
        store.create(policy("p1", "default", 0), None).unwrap();
        store.delete("p1").unwrap();
        assert!(store.find_by_id("p1").is_none());
    }
}
