//! HTTP client for the OpenAI-compatible completion endpoint.
//!
//! The client is intentionally simple — it holds the endpoint address, the
//! API key, and one shared HTTP client. Which model a call targets lives on
//! the request, not here.

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::llm::types::{ChatCompletion, ChatRequest};

use anyhow::Context as _;
use async_trait::async_trait;
use std::time::Duration;

/// The completion collaborator seam.
///
/// Every component that talks to a model holds an `Arc<dyn ChatCompleter>`
/// so tests can substitute a scripted implementation and the host can wrap
/// calls however it likes.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> std::result::Result<ChatCompletion, LlmError>;
}

/// Reqwest-backed client for an OpenAI-compatible endpoint.
pub struct LlmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    /// Build a client from configuration. The timeout applies to every
    /// request issued through this client.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatCompleter for LlmClient {
    async fn complete(&self, request: ChatRequest) -> std::result::Result<ChatCompletion, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(code = status.as_u16(), model = %request.model, "completion call failed");
            return Err(LlmError::Status {
                code: status.as_u16(),
                body,
            });
        }

        response.json::<ChatCompletion>().await.map_err(LlmError::Decode)
    }
}
