//! Concurrent per-category risk scoring.

use crate::config::GuardrailConfig;
use crate::error::{ClassifierError, LlmError};
use crate::llm::client::ChatCompleter;
use crate::llm::types::ChatRequest;
use crate::safety::categories::RiskCategory;
use crate::safety::verdict::{parse_verdict, RiskVerdict};

use std::sync::Arc;
use std::time::Duration;

/// The outcome of scoring one category: the category and either its parsed
/// verdict or the error that kept a verdict from being produced.
#[derive(Debug)]
pub struct CategoryResult {
    pub category: RiskCategory,
    pub verdict: Result<RiskVerdict, ClassifierError>,
}

/// Issues one classifier call per configured risk category.
pub struct RiskScorer {
    client: Arc<dyn ChatCompleter>,
}

impl RiskScorer {
    pub fn new(client: Arc<dyn ChatCompleter>) -> Self {
        Self { client }
    }

    /// Score `prompt` against every category in `config`, concurrently.
    ///
    /// All calls are dispatched up front so total latency is bounded by the
    /// slowest single call, then collected in configuration order. Each
    /// call's failure is captured in its own slot — one category timing out
    /// or erroring never cancels or hides a sibling, and nothing is retried
    /// here.
    pub async fn score(&self, prompt: &str, config: &GuardrailConfig) -> Vec<CategoryResult> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let handles: Vec<(RiskCategory, tokio::task::JoinHandle<_>)> = config
            .resolved_categories()
            .into_iter()
            .map(|category| {
                let client = self.client.clone();
                let request = classifier_request(prompt, &category, config);
                let handle = tokio::spawn(async move {
                    match tokio::time::timeout(timeout, client.complete(request)).await {
                        Ok(Ok(completion)) => parse_verdict(&completion),
                        Ok(Err(error)) => Err(ClassifierError::Call(error)),
                        Err(_) => Err(ClassifierError::Call(LlmError::Timeout(timeout))),
                    }
                });
                (category, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (category, handle) in handles {
            let verdict = match handle.await {
                Ok(verdict) => verdict,
                Err(error) => Err(ClassifierError::Aborted(error.to_string())),
            };

            match &verdict {
                Ok(verdict) => tracing::debug!(
                    category = %category.name,
                    is_risky = verdict.is_risky,
                    risky_confidence = verdict.risky_confidence,
                    "category scored"
                ),
                Err(error) => tracing::warn!(
                    category = %category.name,
                    %error,
                    "category scoring failed"
                ),
            }

            results.push(CategoryResult { category, verdict });
        }

        results
    }
}

fn classifier_request(
    prompt: &str,
    category: &RiskCategory,
    config: &GuardrailConfig,
) -> ChatRequest {
    ChatRequest::user(&config.model, prompt)
        .with_temperature(0.0)
        .with_logprobs(config.top_logprobs)
        .with_guardian(&category.name, &category.definition)
}
