//! Query preprocessing: language detection and query rewrite.
//!
//! One collaborator call per turn detects the input language and rewrites
//! the query into clear English before routing. The stage is best-effort:
//! any failure — call error, timeout, malformed output — leaves the
//! original query untouched and reports the default language.

use crate::config::PreprocessConfig;
use crate::llm::client::ChatCompleter;
use crate::llm::types::ChatRequest;

use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "English";

const PREPROCESSING_PROMPT: &str = "\
Preprocess the user's query before routing to specialized agents.

User query: {user_query}

Your tasks:
1. DETECT LANGUAGE
   - Identify the language of the user's query (English, German, Chinese, Spanish, French, etc.)

2. TRANSLATE TO ENGLISH (if needed)
   - If the query is NOT in English: Translate it to English
   - If already in English: Keep the query as-is
   - Preserve technical terms (e.g., \"Kubernetes\", \"Linux\", \"Python\")
   - Maintain the original intent and meaning

3. ENHANCE QUERY CLARITY
   - Fix obvious typos or grammatical errors
   - Clarify ambiguous terms if needed
   - Ensure the query is clear and specific

OUTPUT FORMAT (Important!):
First line: LANGUAGE: <detected language>
Second line onwards: The preprocessed English query";

/// A preprocessed query and the language it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub detected_language: String,
    pub query: String,
}

impl Preprocessed {
    fn unchanged(query: &str) -> Self {
        Self {
            detected_language: DEFAULT_LANGUAGE.into(),
            query: query.to_string(),
        }
    }
}

/// Parse collaborator output of the form `LANGUAGE: <lang>\n<query>`.
///
/// Degrades without failing: empty output falls back to the original
/// query, and output missing the language header is used wholesale as the
/// query with the default language.
pub fn parse_preprocessing_output(output: &str, fallback_query: &str) -> Preprocessed {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        tracing::warn!("empty preprocessing output");
        return Preprocessed::unchanged(fallback_query);
    }

    if let Some((header, rest)) = trimmed.split_once('\n') {
        if let Some(language) = header.strip_prefix("LANGUAGE:") {
            return Preprocessed {
                detected_language: language.trim().to_string(),
                query: rest.trim().to_string(),
            };
        }
    }

    tracing::warn!("preprocessing output missing LANGUAGE header");
    Preprocessed {
        detected_language: DEFAULT_LANGUAGE.into(),
        query: trimmed.to_string(),
    }
}

/// Best-effort query preprocessor.
pub struct Preprocessor {
    client: Arc<dyn ChatCompleter>,
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(client: Arc<dyn ChatCompleter>, config: PreprocessConfig) -> Self {
        Self { client, config }
    }

    /// Detect the query's language and rewrite it to clear English. Never
    /// fails: every error path returns the query unchanged.
    pub async fn rewrite(&self, query: &str) -> Preprocessed {
        let prompt = PREPROCESSING_PROMPT.replace("{user_query}", query);
        let request = ChatRequest::user(&self.config.model, prompt);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        match tokio::time::timeout(timeout, self.client.complete(request)).await {
            Ok(Ok(completion)) => {
                let output = completion.content().unwrap_or("");
                let preprocessed = parse_preprocessing_output(output, query);
                tracing::debug!(
                    language = %preprocessed.detected_language,
                    "query preprocessed"
                );
                preprocessed
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "query preprocessing failed, keeping original query");
                Preprocessed::unchanged(query)
            }
            Err(_) => {
                tracing::warn!("query preprocessing timed out, keeping original query");
                Preprocessed::unchanged(query)
            }
        }
    }
}
