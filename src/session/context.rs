//! Bounded context preparation for the downstream responder.
//!
//! Short histories are forwarded verbatim; long ones are collapsed by a
//! text-generation collaborator into a concise summary plus the (possibly
//! rewritten) current turn. Either way the output is a list of tagged
//! blocks — context versus current turn — so the responder can weight the
//! two differently. This stage never fails a turn: every collaborator
//! problem degrades to the verbatim path.

use crate::config::SummarizerConfig;
use crate::llm::client::ChatCompleter;
use crate::llm::types::ChatRequest;
use crate::session::consolidate::{ConsolidatedMessage, Role};

use std::sync::Arc;
use std::time::Duration;

/// Delimiter the collaborator is instructed to place between the history
/// summary and the rewritten current turn.
pub const OUTPUT_DELIMITER: &str = "###USER INPUT###";

const CONTEXT_SUMMARIZATION_PROMPT: &str = "\
You are a context consolidation assistant. Your task is to prepare a concise but complete context for an AI agent.

**Conversation History:**
{conversation_history_text}

**Last User Input:**
{last_user_input}

Instructions:
1. Summarize the conversation history into a CONCISE context summary that:
   - Preserves ALL specific identifiers (cluster names, IDs, version numbers, error codes, file paths, commands, etc.)
   - Captures key facts, decisions, and outcomes from the conversation
   - Removes redundancy and conversational filler
   - Uses bullet points or structured format if it improves clarity

2. For the last user input:
   - Keep it EXACTLY as written if it's self-contained and clear
   - ONLY modify it if it contains references that need resolution:
     * Pronouns: \"it\", \"this\", \"that\", \"them\", \"they\", \"these\", \"those\"
     * Demonstratives: \"the same one\", \"the previous\", \"the above\"
     * Implicit references: \"also\", \"again\", \"still\"
   - When resolving references, make minimal changes - just replace the ambiguous term with what it refers to

3. Output format:
   - Start with \"Context Summary: <concise context summary>\" then on a new line add \"###USER INPUT### <last user input>\"
   - If last user input doesn't need changes: Use it verbatim

**Output:**";

/// How a block should be weighted by the downstream responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Background from earlier in the conversation.
    Context,
    /// The message the responder is actually answering.
    CurrentTurn,
}

/// One tagged block of the outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBlock {
    pub kind: BlockKind,
    pub text: String,
}

impl MessageBlock {
    fn context(text: String) -> Self {
        Self { kind: BlockKind::Context, text }
    }

    fn current_turn(text: String) -> Self {
        Self { kind: BlockKind::CurrentTurn, text }
    }
}

/// Collapses long consolidated histories into a bounded context block.
pub struct ContextSummarizer {
    client: Arc<dyn ChatCompleter>,
    config: SummarizerConfig,
}

impl ContextSummarizer {
    pub fn new(client: Arc<dyn ChatCompleter>, config: SummarizerConfig) -> Self {
        Self { client, config }
    }

    /// Prepare tagged blocks for the turn. The last message is always the
    /// current turn; everything earlier becomes context, summarized only
    /// when the history is big enough to warrant a collaborator call.
    pub async fn prepare(&self, messages: &[ConsolidatedMessage]) -> Vec<MessageBlock> {
        let Some((current, history)) = messages.split_last() else {
            return Vec::new();
        };

        if history.is_empty() {
            return vec![MessageBlock::current_turn(current.text.clone())];
        }

        let rendered: Vec<String> = history.iter().map(render_history_line).collect();
        let total_chars: usize =
            rendered.iter().map(String::len).sum::<usize>() + current.text.len();

        if total_chars < self.config.min_chars {
            tracing::debug!(total_chars, "history below summarization threshold, forwarding verbatim");
            return verbatim_blocks(&rendered, current);
        }

        let prompt = CONTEXT_SUMMARIZATION_PROMPT
            .replace("{conversation_history_text}", &rendered.join("\n---\n"))
            .replace("{last_user_input}", &current.text);
        let request = ChatRequest::user(&self.config.model, prompt);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let content = match tokio::time::timeout(timeout, self.client.complete(request)).await {
            Ok(Ok(completion)) => completion.content().map(String::from),
            Ok(Err(error)) => {
                tracing::warn!(%error, "context summarization failed, forwarding verbatim history");
                return verbatim_blocks(&rendered, current);
            }
            Err(_) => {
                tracing::warn!("context summarization timed out, forwarding verbatim history");
                return verbatim_blocks(&rendered, current);
            }
        };

        let Some(content) = content.filter(|text| !text.is_empty()) else {
            tracing::warn!("empty summarization response, forwarding verbatim history");
            return verbatim_blocks(&rendered, current);
        };

        let (current_turn, summary) = split_summarized_response(&content);
        let mut blocks = Vec::with_capacity(2);
        if let Some(summary) = summary {
            blocks.push(MessageBlock::context(summary));
        }
        blocks.push(MessageBlock::current_turn(current_turn));
        blocks
    }
}

/// Split a collaborator response on the first delimiter occurrence.
///
/// Returns `(current_turn, summary)`. A missing delimiter — or nothing
/// after it — degrades to the whole response as the current turn with no
/// summary, never to a failed turn.
fn split_summarized_response(response: &str) -> (String, Option<String>) {
    match response.split_once(OUTPUT_DELIMITER) {
        Some((summary, current)) if !current.trim().is_empty() => {
            let summary = summary.trim();
            (
                current.trim().to_string(),
                (!summary.is_empty()).then(|| summary.to_string()),
            )
        }
        _ => {
            tracing::warn!("summarization response missing delimiter, using it as the current turn");
            (response.to_string(), None)
        }
    }
}

fn render_history_line(message: &ConsolidatedMessage) -> String {
    match message.role {
        Role::User => format!("User previously asked: {}", message.text),
        Role::Agent => format!(
            "[{}] replied: {}",
            message.author.as_deref().unwrap_or("agent"),
            message.text
        ),
    }
}

fn verbatim_blocks(rendered: &[String], current: &ConsolidatedMessage) -> Vec<MessageBlock> {
    let mut blocks = Vec::with_capacity(2);
    if !rendered.is_empty() {
        blocks.push(MessageBlock::context(format!(
            "Context Summary:\n{}",
            rendered.join("\n---\n")
        )));
    }
    blocks.push(MessageBlock::current_turn(current.text.clone()));
    blocks
}
