//! The sidecar runtime: a local evaluation-only read path (C9) over a
//! policy set mirrored from the platform's store, matching the spec's
//! "policies are created (draft/active)... the engine exclusively owns its
//! loaded active-policy set (a snapshot view of C7)" ownership rule - here
//! the snapshot crosses a process boundary instead of living in-process.

use message_queue::{fingerprint, TwoTierCache};
use metrics::{AuditLog, EvaluationRecord};
use policy_engine::{EvaluationRequest, Policy, PolicyDecision, PolicyEngine, PolicyId};
use reaper_core::{ReaperError, RequestId, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const MAX_BATCH_SIZE: usize = 100;

pub struct AgentRuntime {
    engine: PolicyEngine,
    cache: Arc<TwoTierCache>,
    audit: Arc<dyn AuditLog>,
    http: reqwest::Client,
    platform_base_url: String,
}

impl AgentRuntime {
    pub fn new(cache: Arc<TwoTierCache>, audit: Arc<dyn AuditLog>, platform_base_url: String) -> Self {
        Self {
            engine: PolicyEngine::new(),
            cache,
            audit,
            http: reqwest::Client::new(),
            platform_base_url,
        }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn cache(&self) -> &TwoTierCache {
        &self.cache
    }

    /// Pulls the platform's active policy set and reconciles the local
    /// engine snapshot to match it exactly - policies the platform no
    /// longer reports active are removed locally, not just left stale.
    pub async fn sync_policies(&self) -> Result<usize> {
        #[derive(serde::Deserialize)]
        struct ListResponse {
            policies: Vec<Policy>,
        }

        let url = format!("{}{}", self.platform_base_url, reaper_core::endpoints::API_V1_POLICIES);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ReaperError::StoreError { reason: format!("failed to reach platform: {e}") })?
            .json::<ListResponse>()
            .await
            .map_err(|e| ReaperError::StoreError { reason: format!("malformed policy list: {e}") })?;

        let fetched_ids: HashSet<PolicyId> = response.policies.iter().map(|p| p.metadata.id.clone()).collect();
        let stale: Vec<PolicyId> = self
            .engine
            .list()
            .into_iter()
            .map(|p| p.metadata.id)
            .filter(|id| !fetched_ids.contains(id))
            .collect();

        let count = response.policies.len();
        for policy in response.policies {
            self.engine.update(policy);
        }
        for id in stale {
            self.engine.remove(&id);
        }
        Ok(count)
    }

    /// Runs `sync_policies` on a fixed interval until the process exits.
    /// Sync failures are logged, not fatal - the sidecar keeps evaluating
    /// against its last-known-good snapshot.
    pub async fn run_refresh_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sync_policies().await {
                warn!(error = %e, "policy sync with platform failed, evaluating against stale snapshot");
            }
        }
    }

    pub fn evaluate(&self, req: EvaluationRequest) -> Result<PolicyDecision> {
        let eligible = req.use_cache && !req.trace && !req.dry_run;
        let key = fingerprint(&req.context, &req.policies);

        let (decision, cached) = if eligible {
            if let Some(decision) = self.cache.get::<PolicyDecision>(&key) {
                (decision, true)
            } else {
                let decision = self.engine.evaluate(&req)?;
                self.cache.set(&key, &decision, None)?;
                (decision, false)
            }
        } else {
            (self.engine.evaluate(&req)?, false)
        };

        if !req.dry_run {
            let record = EvaluationRecord::new(
                RequestId::new_v4(),
                req.policies.clone(),
                req.context.clone(),
                &decision,
                cached,
                chrono::Utc::now(),
            )
            .with_scope(
                req.context.lookup_str("namespace"),
                req.context.lookup_str("user.id"),
                req.context.lookup_str("team.id"),
                req.context.lookup_str("project.id"),
            );
            self.audit.log(record)?;
        }

        Ok(decision)
    }

    pub fn batch_evaluate(&self, reqs: Vec<EvaluationRequest>) -> Result<Vec<PolicyDecision>> {
        if reqs.len() > MAX_BATCH_SIZE {
            return Err(ReaperError::ValidationError {
                errors: vec![format!("batch size {} exceeds the limit of {MAX_BATCH_SIZE}", reqs.len())],
            });
        }
        reqs.into_iter().map(|req| self.evaluate(req)).collect()
    }

    pub fn simulate(&self, context: reaper_core::ContextValue, policies: Vec<PolicyId>) -> Result<PolicyDecision> {
        self.engine.evaluate(&EvaluationRequest::simulate(context, policies))
    }
}
