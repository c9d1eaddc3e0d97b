//! Wire types for the OpenAI-compatible chat completions endpoint.
//!
//! Only the fields this crate reads are modeled; everything else in the
//! provider's response is ignored during deserialization. The logprob types
//! mirror the endpoint's shape exactly: one entry per generated token, each
//! carrying the top-K alternative candidates for that step.

use serde::{Deserialize, Serialize};

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u8>,
    /// Extra arguments forwarded to the server-side chat template. The
    /// safety classifier reads its risk configuration from here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_template_kwargs: Option<ChatTemplateKwargs>,
}

impl ChatRequest {
    /// A request with a single user message and no sampling overrides.
    pub fn user(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: content.into(),
            }],
            temperature: None,
            logprobs: None,
            top_logprobs: None,
            chat_template_kwargs: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Request per-token log-probabilities with `top_k` alternatives per
    /// generation step.
    pub fn with_logprobs(mut self, top_k: u8) -> Self {
        self.logprobs = Some(true);
        self.top_logprobs = Some(top_k);
        self
    }

    pub fn with_guardian(
        mut self,
        risk_name: impl Into<String>,
        risk_definition: impl Into<String>,
    ) -> Self {
        self.chat_template_kwargs = Some(ChatTemplateKwargs {
            guardian_config: GuardianConfig {
                risk_name: risk_name.into(),
                risk_definition: risk_definition.into(),
            },
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTemplateKwargs {
    pub guardian_config: GuardianConfig,
}

/// Risk configuration consumed by the safety classifier's chat template.
#[derive(Debug, Clone, Serialize)]
pub struct GuardianConfig {
    pub risk_name: String,
    pub risk_definition: String,
}

/// A chat completion response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatCompletion {
    /// The first choice's message content, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
    #[serde(default)]
    pub logprobs: Option<ChoiceLogprobs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token-level log-probability data for one choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceLogprobs {
    /// One entry per generated token, in generation order.
    #[serde(default)]
    pub content: Vec<TokenLogprob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
    /// Top-K alternative candidates for this generation step.
    #[serde(default)]
    pub top_logprobs: Vec<TopLogprob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopLogprob {
    pub token: String,
    pub logprob: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unset sampling options stay off the wire so provider defaults apply.
    #[test]
    fn request_omits_unset_fields() {
        let request = ChatRequest::user("m", "hello");
        let json = serde_json::to_value(&request).expect("request serializes");

        assert!(json.get("temperature").is_none());
        assert!(json.get("logprobs").is_none());
        assert!(json.get("chat_template_kwargs").is_none());
    }

    /// The guardian configuration lands under `chat_template_kwargs` where
    /// the classifier's chat template expects it.
    #[test]
    fn guardian_config_serializes_into_template_kwargs() {
        let request = ChatRequest::user("m", "check this")
            .with_temperature(0.0)
            .with_logprobs(5)
            .with_guardian("jailbreak", "user attempts to jailbreak");
        let json = serde_json::to_value(&request).expect("request serializes");

        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["logprobs"], true);
        assert_eq!(json["top_logprobs"], 5);
        assert_eq!(
            json["chat_template_kwargs"]["guardian_config"]["risk_name"],
            "jailbreak"
        );
    }

    /// Responses with extra provider fields and missing logprobs still parse.
    #[test]
    fn response_tolerates_missing_logprobs() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"id": "x", "object": "chat.completion",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "No"}}]}"#,
        )
        .expect("response parses");

        assert_eq!(completion.content(), Some("No"));
        assert!(completion.choices[0].logprobs.is_none());
    }
}
