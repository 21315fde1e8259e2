//! Context enrichment primitives (C1): token estimation, PII detection, and
//! cost estimation. Pure, synchronous, and deliberately approximate -
//! exact tokenization and secret storage are explicit non-goals.

pub mod cost;
pub mod pii;
pub mod token;

pub use cost::{CostEstimate, CostEstimator, PricingRate};
pub use pii::{detect as detect_pii, redact_pii_with_labels, redact_with_char, redact_with_labels, Confidence, PiiMatch, PiiType};
pub use token::{estimate as estimate_tokens, estimate_conversation, max_completion, max_context, TokenEstimate, TokenMethod};
