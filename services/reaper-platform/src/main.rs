//! # Reaper Platform
//!
//! The policy store (C7) and Decision API (C9) exposed over HTTP.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use message_queue::TwoTierCache;
use metrics::{InMemoryAuditLog, QueryFilters};
use policy_engine::{EvaluationRequest, Policy};
use reaper_core::{endpoints, ReaperConfig, ReaperError, RequestId, BUILD_INFO, VERSION};
use reaper_platform::{DecisionApi, PolicyPatch, PolicyStore};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument};

#[derive(Clone)]
struct PlatformState {
    api: Arc<DecisionApi>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting Reaper Platform {}", BUILD_INFO);

    let config = ReaperConfig::from_env();
    let store = Arc::new(PolicyStore::new());
    let cache = Arc::new(TwoTierCache::new(config.cache.clone()));
    let audit = Arc::new(InMemoryAuditLog::new());
    let api = Arc::new(DecisionApi::new(store, cache, audit));
    let state = PlatformState { api };

    let app = Router::new()
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::METRICS, get(metrics))
        .route(endpoints::API_V1_POLICIES, get(list_policies).post(create_policy))
        .route(
            "/api/v1/policies/{id}",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
        .route(endpoints::API_V1_VALIDATE, post(validate_policy))
        .route(endpoints::API_V1_EVALUATE, post(evaluate))
        .route(endpoints::API_V1_BATCH_EVALUATE, post(batch_evaluate))
        .route(endpoints::API_V1_SIMULATE, post(simulate))
        .route(endpoints::API_V1_AUDIT, get(audit_history))
        .route("/api/v1/audit/{request_id}", get(audit_by_request_id))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Reaper Platform listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

fn status_for(err: &ReaperError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[instrument]
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "reaper-platform",
        "version": VERSION
    }))
}

#[instrument(skip(state))]
async fn metrics(State(state): State<PlatformState>) -> Result<Json<Value>, StatusCode> {
    let stats = state.api.stats(None, None).map_err(|e| status_for(&e))?;
    Ok(Json(json!({
        "service": "reaper-platform",
        "engine": state.api.engine().metrics(),
        "cache": state.api.cache().local_stats(),
        "evaluations": stats,
    })))
}

#[instrument(skip(state))]
async fn list_policies(State(state): State<PlatformState>) -> Json<Value> {
    let policies = state.api.list_active_policies();
    Json(json!({ "policies": policies, "total": policies.len() }))
}

#[instrument(skip(state, payload))]
async fn create_policy(
    State(state): State<PlatformState>,
    Json(payload): Json<Policy>,
) -> Result<Json<Policy>, StatusCode> {
    state.api.create_policy(payload, None).map(Json).map_err(|e| status_for(&e))
}

#[instrument(skip(state))]
async fn get_policy(State(state): State<PlatformState>, Path(id): Path<String>) -> Result<Json<Policy>, StatusCode> {
    state.api.get_policy(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[instrument(skip(state, payload))]
async fn update_policy(
    State(state): State<PlatformState>,
    Path(id): Path<String>,
    Json(payload): Json<PolicyPatch>,
) -> Result<Json<Policy>, StatusCode> {
    state.api.update_policy(&id, payload).map(Json).map_err(|e| status_for(&e))
}

#[instrument(skip(state))]
async fn delete_policy(State(state): State<PlatformState>, Path(id): Path<String>) -> Result<StatusCode, StatusCode> {
    state.api.delete_policy(&id).map(|_| StatusCode::NO_CONTENT).map_err(|e| status_for(&e))
}

#[instrument(skip(payload))]
async fn validate_policy(Json(payload): Json<Policy>) -> Json<policy_engine::ValidationResult> {
    Json(policy_engine::validate(&payload))
}

#[instrument(skip(state, payload))]
async fn evaluate(
    State(state): State<PlatformState>,
    Json(payload): Json<EvaluationRequest>,
) -> Result<Json<policy_engine::PolicyDecision>, StatusCode> {
    state.api.evaluate(payload).map(Json).map_err(|e| status_for(&e))
}

#[instrument(skip(state, payload))]
async fn batch_evaluate(
    State(state): State<PlatformState>,
    Json(payload): Json<Vec<EvaluationRequest>>,
) -> Result<Json<Vec<policy_engine::PolicyDecision>>, StatusCode> {
    state.api.batch_evaluate(payload).map(Json).map_err(|e| status_for(&e))
}

#[derive(Debug, Deserialize)]
struct SimulateBody {
    context: reaper_core::ContextValue,
    #[serde(default)]
    policies: Vec<String>,
}

#[instrument(skip(state, payload))]
async fn simulate(
    State(state): State<PlatformState>,
    Json(payload): Json<SimulateBody>,
) -> Result<Json<policy_engine::PolicyDecision>, StatusCode> {
    state
        .api
        .simulate(payload.context, payload.policies)
        .map(Json)
        .map_err(|e| status_for(&e))
}

#[instrument(skip(state))]
async fn audit_history(
    State(state): State<PlatformState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let filters = QueryFilters {
        limit: params.get("limit").and_then(|v| v.parse().ok()),
        offset: params.get("offset").and_then(|v| v.parse().ok()),
        allowed: params.get("allowed").and_then(|v| v.parse().ok()),
        ..Default::default()
    };
    let records = state.api.find_history(filters).map_err(|e| status_for(&e))?;
    Ok(Json(json!({ "records": records, "total": records.len() })))
}

#[instrument(skip(state))]
async fn audit_by_request_id(
    State(state): State<PlatformState>,
    Path(request_id): Path<RequestId>,
) -> Result<Json<Value>, StatusCode> {
    let record = state.api.find_by_request_id(request_id).map_err(|e| status_for(&e))?;
    match record {
        Some(record) => Ok(Json(json!(record))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
