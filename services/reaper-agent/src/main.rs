//! # Reaper Agent
//!
//! Sidecar evaluation-only service: mirrors the platform's active policy
//! set locally and serves `evaluate`/`simulate` off that snapshot, so a
//! policy lookup never leaves the host the caller is running on.

use axum::{extract::State, http::StatusCode, response::Json, routing::{get, post}, Router};
use message_queue::TwoTierCache;
use metrics::InMemoryAuditLog;
use policy_engine::EvaluationRequest;
use reaper_agent::AgentRuntime;
use reaper_core::{endpoints, ReaperConfig, ReaperError, BUILD_INFO, VERSION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, instrument};

#[derive(Clone)]
struct AgentState {
    runtime: Arc<AgentRuntime>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting Reaper Agent {}", BUILD_INFO);

    let config = ReaperConfig::from_env();
    let platform_base_url = env::var("PLATFORM_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());
    let refresh_interval = env::var("POLICY_SYNC_INTERVAL_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30u64);

    let cache = Arc::new(TwoTierCache::new(config.cache.clone()));
    let audit = Arc::new(InMemoryAuditLog::new());
    let runtime = Arc::new(AgentRuntime::new(cache, audit, platform_base_url));

    if let Err(e) = runtime.sync_policies().await {
        tracing::warn!(error = %e, "initial policy sync failed, starting with an empty snapshot");
    }
    tokio::spawn(Arc::clone(&runtime).run_refresh_loop(Duration::from_secs(refresh_interval)));

    let state = AgentState { runtime };

    let app = Router::new()
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::METRICS, get(metrics))
        .route(endpoints::API_V1_EVALUATE, post(evaluate))
        .route(endpoints::API_V1_BATCH_EVALUATE, post(batch_evaluate))
        .route(endpoints::API_V1_SIMULATE, post(simulate))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Reaper Agent listening on {}", listener.local_addr()?);

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
        "service": "reaper-agent",
        "version": VERSION
    }))
}

#[instrument(skip(state))]
async fn metrics(State(state): State<AgentState>) -> Json<Value> {
    Json(json!({
        "service": "reaper-agent",
        "engine": state.runtime.engine().metrics(),
        "cache": state.runtime.cache().local_stats(),
    }))
}

#[instrument(skip(state, payload))]
async fn evaluate(
    State(state): State<AgentState>,
    Json(payload): Json<EvaluationRequest>,
) -> Result<Json<policy_engine::PolicyDecision>, StatusCode> {
    state.runtime.evaluate(payload).map(Json).map_err(|e| status_for(&e))
}

#[instrument(skip(state, payload))]
async fn batch_evaluate(
    State(state): State<AgentState>,
    Json(payload): Json<Vec<EvaluationRequest>>,
) -> Result<Json<Vec<policy_engine::PolicyDecision>>, StatusCode> {
    state.runtime.batch_evaluate(payload).map(Json).map_err(|e| status_for(&e))
}

#[derive(Debug, Deserialize)]
struct SimulateBody {
    context: reaper_core::ContextValue,
    #[serde(default)]
    policies: Vec<String>,
}

#[instrument(skip(state, payload))]
async fn simulate(
    State(state): State<AgentState>,
    Json(payload): Json<SimulateBody>,
) -> Result<Json<policy_engine::PolicyDecision>, StatusCode> {
    state
        .runtime
        .simulate(payload.context, payload.policies)
        .map(Json)
        .map_err(|e| status_for(&e))
}
