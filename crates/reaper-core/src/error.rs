//! Error types for the Reaper policy decision point

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaperError>;

/// Error kinds produced anywhere in the decision path.
///
/// Cache errors never reach here - they degrade to a miss inside
/// `message-queue` - and audit errors never reach here either; both log and
/// continue at their own boundary. Everything below is something a caller of
/// `policy-engine` or the Decision API can legitimately see.
#[derive(Error, Debug)]
pub enum ReaperError {
    #[error("failed to parse policy document: {reason}")]
    ParseError { reason: String },

    #[error("policy failed validation: {}", .errors.join("; "))]
    ValidationError { errors: Vec<String> },

    #[error("Policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },

    #[error("evaluation record not found: {request_id}")]
    RecordNotFound { request_id: String },

    #[error("Invalid policy definition: {reason}")]
    InvalidPolicy { reason: String },

    #[error("Policy evaluation failed: {reason}")]
    EvaluationError { reason: String },

    #[error("cache operation failed: {reason}")]
    CacheError { reason: String },

    #[error("store operation failed: {reason}")]
    StoreError { reason: String },

    #[error("authentication failed: {reason}")]
    AuthError { reason: String },

    #[error("rate limit exceeded: {reason}")]
    RateLimitError { reason: String },

    #[error("evaluation deadline exceeded after {elapsed_ms}ms")]
    TimeoutError { elapsed_ms: u64 },

    #[error("conflicting policy state: {reason}")]
    ConflictError { reason: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },
}

impl ReaperError {
    /// Maps an error kind to the user-visible HTTP status it should surface as.
    pub fn status_code(&self) -> u16 {
        match self {
            ReaperError::ParseError { .. } | ReaperError::ValidationError { .. } => 400,
            ReaperError::InvalidPolicy { .. } => 400,
            ReaperError::AuthError { .. } => 401,
            ReaperError::PolicyNotFound { .. } | ReaperError::RecordNotFound { .. } => 404,
            ReaperError::ConflictError { .. } => 409,
            ReaperError::RateLimitError { .. } => 429,
            ReaperError::TimeoutError { .. } => 408,
            ReaperError::EvaluationError { .. }
            | ReaperError::StoreError { .. }
            | ReaperError::SerializationError { .. } => 500,
            ReaperError::CacheError { .. } => 503,
        }
    }
}
