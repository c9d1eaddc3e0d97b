//! Configuration types.
//!
//! Everything here deserializes from whatever the host application loads
//! (file, env, flags — not our concern) and carries sensible defaults so an
//! empty config is a working config. The guardrail section is the one piece
//! of state that can change at runtime: the gate holds it behind an
//! `ArcSwap` so the host can flip the kill switch without a restart.

use serde::{Deserialize, Serialize};

use crate::safety::categories::{builtin_categories, RiskCategory};

/// Top-level configuration for the gateway core.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub guardrails: GuardrailConfig,
    pub summarizer: SummarizerConfig,
    pub preprocess: PreprocessConfig,
}

/// Connection settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    pub api_key: String,
    /// Client-level request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".into(),
            api_key: "empty".into(),
            timeout_secs: 120,
        }
    }
}

/// Input guardrail settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Master switch. When false the gate answers SAFE without issuing a
    /// single classifier call.
    pub enabled: bool,
    /// Safety classifier model name.
    pub model: String,
    /// Default risky-confidence threshold, applied to the built-in category
    /// set when no explicit categories are configured.
    pub confidence_threshold: f64,
    /// Per-call timeout in seconds; an expired call counts as that
    /// category's failure.
    pub timeout_secs: u64,
    /// Top-K alternatives requested per generation step. Must cover the
    /// plausible label-token variants ("Yes", "yes", "Y", ...).
    pub top_logprobs: u8,
    /// Risk categories to score. Empty means the built-in set.
    pub categories: Vec<RiskCategory>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "ibm/granite-guardian-3.3-8b".into(),
            confidence_threshold: 0.7,
            timeout_secs: 30,
            top_logprobs: 5,
            categories: Vec::new(),
        }
    }
}

impl GuardrailConfig {
    /// The categories to score: the configured list, or the built-in set
    /// at the default threshold when none are configured.
    pub fn resolved_categories(&self) -> Vec<RiskCategory> {
        if self.categories.is_empty() {
            builtin_categories(self.confidence_threshold)
        } else {
            self.categories.clone()
        }
    }
}

/// Context summarization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub model: String,
    /// Histories below this many characters are forwarded verbatim.
    pub min_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-oss-20b".into(),
            min_chars: 2000,
            timeout_secs: 30,
        }
    }
}

/// Query preprocessing (language detection + rewrite) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub enabled: bool,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "openai/gpt-oss-20b".into(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An empty document yields the full default configuration.
    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").expect("empty config parses");

        assert!(config.guardrails.enabled);
        assert_eq!(config.guardrails.confidence_threshold, 0.7);
        assert_eq!(config.summarizer.min_chars, 2000);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
    }

    /// Explicit categories replace the built-in set entirely.
    #[test]
    fn explicit_categories_override_builtins() {
        let config: GuardrailConfig = serde_json::from_str(
            r#"{"categories": [{"name": "custom", "definition": "d", "threshold": 0.4}]}"#,
        )
        .expect("config parses");

        let categories = config.resolved_categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "custom");
        assert_eq!(categories[0].threshold, 0.4);
    }

    /// No configured categories resolves to the built-in set at the default
    /// threshold.
    #[test]
    fn builtin_categories_inherit_default_threshold() {
        let config = GuardrailConfig {
            confidence_threshold: 0.9,
            ..Default::default()
        };

        let categories = config.resolved_categories();
        assert!(!categories.is_empty());
        assert!(categories.iter().all(|c| c.threshold == 0.9));
    }
}
