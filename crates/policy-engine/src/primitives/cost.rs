//! Cost estimation (C1).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRate {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
    pub currency: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub prompt_cost: f64,
    pub completion_cost: f64,
    pub total_cost: f64,
    pub currency: String,
}

const DEFAULT_RATE: PricingRate = PricingRate { prompt_per_1k: 0.01, completion_per_1k: 0.03, currency: "USD" };

pub struct CostEstimator {
    // keyed by (lowercase provider, lowercase model), for exact lookup
    index: HashMap<(String, String), usize>,
    // insertion order preserved, so substring fallback is deterministic and
    // picks the first-declared (most specific) match within a provider
    entries: Vec<(String, String, PricingRate)>,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::with_default_pricing()
    }
}

impl CostEstimator {
    pub fn new() -> Self {
        Self { index: HashMap::new(), entries: Vec::new() }
    }

    pub fn with_default_pricing() -> Self {
        let mut estimator = Self::new();
        let rates: &[(&str, &str, f64, f64, &'static str)] = &[
            ("openai", "gpt-4o", 0.005, 0.015, "USD"),
            ("openai", "gpt-4-turbo", 0.01, 0.03, "USD"),
            ("openai", "gpt-4", 0.03, 0.06, "USD"),
            ("openai", "gpt-3.5-turbo", 0.0005, 0.0015, "USD"),
            ("anthropic", "claude-3-opus", 0.015, 0.075, "USD"),
            ("anthropic", "claude-3-sonnet", 0.003, 0.015, "USD"),
            ("anthropic", "claude-3-haiku", 0.00025, 0.00125, "USD"),
            ("google", "gemini-1.5-pro", 0.0035, 0.0105, "USD"),
            ("google", "gemini-1.5-flash", 0.00035, 0.00105, "USD"),
        ];
        for (provider, model, p, c, currency) in rates {
            estimator.set_rate(provider, model, *p, *c, currency);
        }
        estimator
    }

    pub fn set_rate(&mut self, provider: &str, model: &str, prompt_per_1k: f64, completion_per_1k: f64, currency: &'static str) {
        let provider = provider.to_ascii_lowercase();
        let model = model.to_ascii_lowercase();
        let rate = PricingRate { prompt_per_1k, completion_per_1k, currency };

        if let Some(&idx) = self.index.get(&(provider.clone(), model.clone())) {
            self.entries[idx].2 = rate;
            return;
        }
        self.index.insert((provider.clone(), model.clone()), self.entries.len());
        self.entries.push((provider, model, rate));
    }

    /// Lookup strategy: exact match, then the first provider-scoped entry
    /// (in declaration order) whose model name is a case-insensitive
    /// substring of the requested model, then the global default.
    fn rate_for(&self, provider: &str, model: &str) -> PricingRate {
        let provider = provider.to_ascii_lowercase();
        let model = model.to_ascii_lowercase();

        if let Some(&idx) = self.index.get(&(provider.clone(), model.clone())) {
            return self.entries[idx].2.clone();
        }

        for (p, keyed_model, rate) in &self.entries {
            if *p == provider && model.contains(keyed_model.as_str()) {
                return rate.clone();
            }
        }

        DEFAULT_RATE
    }

    pub fn estimate(&self, provider: &str, model: &str, prompt_tokens: u64, completion_tokens: u64) -> CostEstimate {
        let rate = self.rate_for(provider, model);
        let prompt_cost = (prompt_tokens as f64 / 1000.0) * rate.prompt_per_1k;
        let completion_cost = (completion_tokens as f64 / 1000.0) * rate.completion_per_1k;
        CostEstimate {
            prompt_cost,
            completion_cost,
            total_cost: prompt_cost + completion_cost,
            currency: rate.currency.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_uses_keyed_rate() {
        let estimator = CostEstimator::with_default_pricing();
        let est = estimator.estimate("openai", "gpt-4", 1000, 500);
        assert!((est.prompt_cost - 0.03).abs() < 1e-9);
        assert!((est.completion_cost - 0.03).abs() < 1e-9);
    }

    #[test]
    fn substring_match_within_provider() {
        let estimator = CostEstimator::with_default_pricing();
        let est = estimator.estimate("openai", "gpt-4-turbo-2024-04-09", 1000, 1000);
        assert!((est.prompt_cost - 0.01).abs() < 1e-9);
    }

    #[test]
    fn unknown_provider_and_model_uses_default_pricing() {
        let estimator = CostEstimator::with_default_pricing();
        let est = estimator.estimate("unknown-provider", "unknown-model", 1000, 1000);
        assert!((est.prompt_cost - 0.01).abs() < 1e-9);
        assert!((est.completion_cost - 0.03).abs() < 1e-9);
        assert_eq!(est.currency, "USD");
    }

    #[test]
    fn case_insensitive_lookup() {
        let estimator = CostEstimator::with_default_pricing();
        let est = estimator.estimate("OpenAI", "GPT-4", 1000, 0);
        assert!((est.prompt_cost - 0.03).abs() < 1e-9);
    }
}
