//! Exercises `reaper-core`'s own surface (context lookup, error/status
//! mapping) - the policy evaluation story itself lives in `policy-engine`.

use cucumber::{given, then, when, World};
use reaper_core::{ContextValue, ReaperError};
use serde_json::json;

#[derive(Debug, World)]
#[world(init = Self::new)]
struct ReaperWorld {
    context: ContextValue,
    looked_up: Option<ContextValue>,
    error: Option<ReaperError>,
}

impl ReaperWorld {
    fn new() -> Self {
        Self { context: ContextValue::Null, looked_up: None, error: None }
    }
}

#[given("a request context with a nested llm block")]
async fn given_nested_context(world: &mut ReaperWorld) {
    world.context = json!({
        "llm": {"provider": "openai", "model": "gpt-4", "estimatedTokens": 1200},
        "user": {"id": "u-1"}
    })
    .into();
}

#[when(expr = "I look up the path {string}")]
async fn when_lookup(world: &mut ReaperWorld, path: String) {
    world.looked_up = world.context.lookup(&path).cloned();
}

#[then(expr = "the looked up value should be the string {string}")]
async fn then_lookup_string(world: &mut ReaperWorld, expected: String) {
    assert_eq!(world.looked_up.as_ref().and_then(|v| v.as_str()), Some(expected.as_str()));
}

#[then("the looked up value should be absent")]
async fn then_lookup_absent(world: &mut ReaperWorld) {
    assert!(world.looked_up.is_none());
}

#[given(expr = "a policy-not-found error for {string}")]
async fn given_policy_not_found(world: &mut ReaperWorld, policy_id: String) {
    world.error = Some(ReaperError::PolicyNotFound { policy_id });
}

#[then(expr = "the error should map to status {int}")]
async fn then_error_status(world: &mut ReaperWorld, status: u16) {
    let error = world.error.as_ref().expect("no error recorded");
    assert_eq!(error.status_code(), status);
}

#[then(expr = "the error message should mention {string}")]
async fn then_error_message_mentions(world: &mut ReaperWorld, needle: String) {
    let error = world.error.as_ref().expect("no error recorded");
    assert!(error.to_string().contains(&needle));
}

#[tokio::main]
async fn main() {
    ReaperWorld::run("tests/features").await;
}
