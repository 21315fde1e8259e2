//! Token estimation (C1).
//!
//! Deliberately an estimate, never a real tokenizer: exact tokenization is a
//! documented non-goal. The ratio and max-context table below are tuned to
//! be "close enough" for policy decisions, not billing-accurate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMethod {
    Exact,
    Estimate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub tokens: u64,
    pub method: TokenMethod,
}

/// Known model context-window prefixes, longest/most-specific entries first
/// so substring matching picks the tightest match.
const MAX_CONTEXT_TABLE: &[(&str, u64)] = &[
    ("gpt-4-32k", 32_768),
    ("gpt-4-turbo", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo-16k", 16_384),
    ("gpt-3.5", 4_096),
    ("claude-3-opus", 200_000),
    ("claude-3-sonnet", 200_000),
    ("claude-3-haiku", 200_000),
    ("claude-2", 100_000),
    ("claude", 100_000),
    ("gemini-1.5-pro", 1_048_576),
    ("gemini-1.5", 1_000_000),
    ("gemini", 32_760),
    ("palm-2", 8_192),
    ("palm", 8_192),
    ("llama-3", 8_192),
    ("llama-2", 4_096),
    ("mistral", 32_768),
];

const DEFAULT_MAX_CONTEXT: u64 = 4_096;

fn ratio_for_model(model: Option<&str>) -> f64 {
    match model {
        Some(m) => {
            let lower = m.to_ascii_lowercase();
            if lower.contains("palm") || lower.contains("gemini") {
                4.5
            } else {
                4.0
            }
        }
        None => 4.0,
    }
}

/// Estimates the token count of a single text blob.
pub fn estimate(text: &str, model: Option<&str>) -> TokenEstimate {
    if text.is_empty() {
        return TokenEstimate { tokens: 0, method: TokenMethod::Exact };
    }

    let ratio = ratio_for_model(model);
    let tokens = (text.chars().count() as f64 / ratio).ceil() as u64;
    TokenEstimate { tokens, method: TokenMethod::Estimate }
}

/// Estimates the token count of a multi-message conversation: each message
/// adds a fixed per-message overhead plus a conversation base overhead.
pub fn estimate_conversation(messages: &[&str], model: Option<&str>) -> TokenEstimate {
    if messages.is_empty() {
        return TokenEstimate { tokens: 0, method: TokenMethod::Exact };
    }

    let ratio = ratio_for_model(model);
    let mut tokens: u64 = 3;
    for message in messages {
        let body = (message.chars().count() as f64 / ratio).ceil() as u64;
        tokens += body + 4;
    }
    TokenEstimate { tokens, method: TokenMethod::Estimate }
}

/// Looks up the max context window for a model by case-insensitive prefix
/// substring match; unknown models fall back to a conservative default.
pub fn max_context(model: &str) -> u64 {
    let lower = model.to_ascii_lowercase();
    MAX_CONTEXT_TABLE
        .iter()
        .find(|(prefix, _)| lower.contains(prefix))
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_MAX_CONTEXT)
}

/// Maximum completion tokens available given a prompt's token usage and the
/// caller's desired completion length.
pub fn max_completion(prompt_tokens: u64, model_max: u64, desired: Option<u64>) -> u64 {
    let budget = model_max.saturating_sub(prompt_tokens);
    match desired {
        Some(d) => d.min(budget),
        None => budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_exact() {
        let est = estimate("", None);
        assert_eq!(est.tokens, 0);
        assert_eq!(est.method, TokenMethod::Exact);
    }

    #[test]
    fn default_ratio_is_four() {
        let est = estimate(&"a".repeat(40), Some("gpt-4"));
        assert_eq!(est.tokens, 10);
        assert_eq!(est.method, TokenMethod::Estimate);
    }

    #[test]
    fn gemini_uses_wider_ratio() {
        let est = estimate(&"a".repeat(45), Some("gemini-1.5-pro"));
        assert_eq!(est.tokens, 10);
    }

    #[test]
    fn palm_case_insensitive_match() {
        let est = estimate(&"a".repeat(9), Some("PaLM-2"));
        assert_eq!(est.tokens, 2);
    }

    #[test]
    fn conversation_adds_per_message_and_base_overhead() {
        let est = estimate_conversation(&["hi", "there"], Some("gpt-4"));
        // base(3) + ("hi": 1 body + 4) + ("there": 2 body + 4)
        assert_eq!(est.tokens, 3 + (1 + 4) + (2 + 4));
    }

    #[test]
    fn unknown_model_falls_back_to_default_context() {
        assert_eq!(max_context("some-future-model"), DEFAULT_MAX_CONTEXT);
    }

    #[test]
    fn known_prefix_resolves_case_insensitively() {
        assert_eq!(max_context("GPT-4-Turbo-Preview"), 128_000);
    }

    #[test]
    fn max_completion_respects_desired_and_budget() {
        assert_eq!(max_completion(1000, 8192, Some(500)), 500);
        assert_eq!(max_completion(8000, 8192, Some(500)), 192);
        assert_eq!(max_completion(8000, 8192, None), 192);
        assert_eq!(max_completion(9000, 8192, None), 0);
    }
}
