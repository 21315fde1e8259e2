//! Operator CLI: validates and simulates policies locally against an
//! embedded engine, and forwards evaluate/policy-CRUD commands to a running
//! platform over HTTP.

use clap::{Parser, Subcommand};
use message_queue::TwoTierCache;
use metrics::{EvaluationRecord, InMemoryAuditLog, AuditLog};
use policy_engine::{parse_json, parse_yaml, validate, EvaluationRequest, Policy, PolicyEngine};
use reaper_core::{endpoints, CacheConfig, PolicyId};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "reaper")]
#[command(about = "Reaper CLI - Policy authoring and decision inspection")]
#[command(version = reaper_core::VERSION)]
struct Cli {
    /// Base URL of a running reaper-platform instance.
    #[arg(long, global = true, env = "PLATFORM_URL", default_value = "http://localhost:8081")]
    platform_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Policy document and store operations
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
    /// Evaluate a context against the platform's active policies, or an
    /// embedded engine loaded from a local directory of policy documents
    Evaluate {
        /// Path to a JSON file holding the request context
        context: PathBuf,
        /// Restrict evaluation to these policy ids (repeatable)
        #[arg(long = "policy")]
        policies: Vec<PolicyId>,
        #[arg(long)]
        trace: bool,
        #[arg(long = "dry-run")]
        dry_run: bool,
        #[arg(long = "no-cache")]
        no_cache: bool,
        /// Evaluate against policy documents in this directory instead of
        /// contacting the platform
        #[arg(long)]
        local: Option<PathBuf>,
    },
    /// Dry-run, traced evaluation against an explicit policy set
    Simulate {
        context: PathBuf,
        /// Policy ids to simulate against
        policies: Vec<PolicyId>,
        /// Simulate against policy documents in this directory instead of
        /// contacting the platform
        #[arg(long)]
        local: Option<PathBuf>,
    },
    /// Platform health and summary metrics
    Status,
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Validate a local policy document without contacting the platform
    Validate { file: PathBuf },
    /// List the platform's active policies
    List,
    /// Create a policy on the platform from a local document
    Create { file: PathBuf },
    /// Update a policy on the platform with a JSON merge-patch document
    Update { id: String, file: PathBuf },
    /// Delete a policy from the platform
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let result = match cli.command {
        Commands::Policy { action } => handle_policy_action(&client, &cli.platform_url, action).await,
        Commands::Evaluate { context, policies, trace, dry_run, no_cache, local } => match local {
            Some(dir) => handle_evaluate_local(dir, context, policies, trace, dry_run, no_cache),
            None => handle_evaluate(&client, &cli.platform_url, context, policies, trace, dry_run, no_cache).await,
        },
        Commands::Simulate { context, policies, local } => match local {
            Some(dir) => handle_simulate_local(dir, context, policies),
            None => handle_simulate(&client, &cli.platform_url, context, policies).await,
        },
        Commands::Status => handle_status(&client, &cli.platform_url).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_policy_document(path: &Path) -> anyhow::Result<Policy> {
    let raw = std::fs::read_to_string(path)?;
    let policy = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&raw)?,
        _ => parse_yaml(&raw)?,
    };
    Ok(policy)
}

fn read_context(path: &Path) -> anyhow::Result<reaper_core::ContextValue> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    Ok(value.into())
}

/// Loads every `.json`/`.yaml`/`.yml` document in `dir` into a fresh engine,
/// for the CLI's embedded-evaluation mode.
fn load_engine_from_dir(dir: &Path) -> anyhow::Result<PolicyEngine> {
    let engine = PolicyEngine::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_document = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("yaml") | Some("yml")
        );
        if !is_document {
            continue;
        }
        let policy = read_policy_document(&path)?;
        engine.add(policy);
    }
    Ok(engine)
}

fn handle_evaluate_local(
    dir: PathBuf,
    context_path: PathBuf,
    policies: Vec<PolicyId>,
    trace: bool,
    dry_run: bool,
    no_cache: bool,
) -> anyhow::Result<()> {
    let engine = load_engine_from_dir(&dir)?;
    let cache = TwoTierCache::new(CacheConfig { enabled: true, ttl_seconds: 300, max_size: 1000 });
    let audit = InMemoryAuditLog::new();

    let context = read_context(&context_path)?;
    let mut request = EvaluationRequest::new(context).with_policies(policies);
    request.trace = trace;
    request.dry_run = dry_run;
    request.use_cache = !no_cache;

    let eligible = request.use_cache && !request.trace && !request.dry_run;
    let key = message_queue::fingerprint(&request.context, &request.policies);
    let (decision, cached) = if eligible {
        if let Some(decision) = cache.get::<policy_engine::PolicyDecision>(&key) {
            (decision, true)
        } else {
            let decision = engine.evaluate(&request)?;
            cache.set(&key, &decision, None)?;
            (decision, false)
        }
    } else {
        (engine.evaluate(&request)?, false)
    };

    if !request.dry_run {
        let record = EvaluationRecord::new(
            reaper_core::RequestId::new_v4(),
            request.policies.clone(),
            request.context.clone(),
            &decision,
            cached,
            chrono::Utc::now(),
        )
        .with_scope(
            request.context.lookup_str("namespace"),
            request.context.lookup_str("user.id"),
            request.context.lookup_str("team.id"),
            request.context.lookup_str("project.id"),
        );
        audit.log(record)?;
    }

    print_json(&decision)
}

fn handle_simulate_local(dir: PathBuf, context_path: PathBuf, policies: Vec<PolicyId>) -> anyhow::Result<()> {
    let engine = load_engine_from_dir(&dir)?;
    let context = read_context(&context_path)?;
    let decision = engine.evaluate(&EvaluationRequest::simulate(context, policies))?;
    print_json(&decision)
}

async fn handle_policy_action(client: &reqwest::Client, base_url: &str, action: PolicyAction) -> anyhow::Result<()> {
    match action {
        PolicyAction::Validate { file } => {
            let policy = read_policy_document(&file)?;
            let result = validate(&policy);
            print_json(&result)?;
            if !result.valid {
                anyhow::bail!("policy failed validation with {} error(s)", result.errors.len());
            }
        }
        PolicyAction::List => {
            let url = format!("{base_url}{}", endpoints::API_V1_POLICIES);
            let body: Value = client.get(url).send().await?.error_for_status()?.json().await?;
            print_json(&body)?;
        }
        PolicyAction::Create { file } => {
            let policy = read_policy_document(&file)?;
            let url = format!("{base_url}{}", endpoints::API_V1_POLICIES);
            let body: Value = client.post(url).json(&policy).send().await?.error_for_status()?.json().await?;
            print_json(&body)?;
        }
        PolicyAction::Update { id, file } => {
            let raw = std::fs::read_to_string(&file)?;
            let patch: Value = serde_json::from_str(&raw)?;
            let url = format!("{base_url}/api/v1/policies/{id}");
            let body: Value = client.put(url).json(&patch).send().await?.error_for_status()?.json().await?;
            print_json(&body)?;
        }
        PolicyAction::Delete { id } => {
            let url = format!("{base_url}/api/v1/policies/{id}");
            client.delete(url).send().await?.error_for_status()?;
            println!("deleted policy {id}");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_evaluate(
    client: &reqwest::Client,
    base_url: &str,
    context_path: PathBuf,
    policies: Vec<PolicyId>,
    trace: bool,
    dry_run: bool,
    no_cache: bool,
) -> anyhow::Result<()> {
    let context = read_context(&context_path)?;
    let mut request = EvaluationRequest::new(context).with_policies(policies);
    request.trace = trace;
    request.dry_run = dry_run;
    request.use_cache = !no_cache;

    let url = format!("{base_url}{}", endpoints::API_V1_EVALUATE);
    let body: Value = client.post(url).json(&request).send().await?.error_for_status()?.json().await?;
    print_json(&body)
}

async fn handle_simulate(
    client: &reqwest::Client,
    base_url: &str,
    context_path: PathBuf,
    policies: Vec<PolicyId>,
) -> anyhow::Result<()> {
    let context = read_context(&context_path)?;
    let url = format!("{base_url}{}", endpoints::API_V1_SIMULATE);
    let body: Value = client
        .post(url)
        .json(&json!({ "context": context, "policies": policies }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    print_json(&body)
}

async fn handle_status(client: &reqwest::Client, base_url: &str) -> anyhow::Result<()> {
    let health_url = format!("{base_url}{}", endpoints::HEALTH);
    let health: Value = client.get(health_url).send().await?.error_for_status()?.json().await?;

    let metrics_url = format!("{base_url}{}", endpoints::METRICS);
    let metrics_body: Value = client.get(metrics_url).send().await?.error_for_status()?.json().await?;

    print_json(&json!({ "health": health, "metrics": metrics_body }))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
