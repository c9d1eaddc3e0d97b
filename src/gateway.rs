//! The per-turn pipeline: gate the input, consolidate the log, bound the
//! context, and hand tagged blocks to the caller's responder.
//!
//! The gateway owns no I/O beyond its collaborator handles and keeps no
//! state between turns. Callers construct it once at startup and share it
//! across requests.

use crate::preprocess::Preprocessor;
use crate::safety::gate::{GuardrailDecision, GuardrailGate};
use crate::session::consolidate::{consolidate, Role};
use crate::session::context::{ContextSummarizer, MessageBlock};
use crate::session::event::{latest_user_message, Event};

use uuid::Uuid;

/// What the caller should do with this turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The turn must not proceed. `message` is the only text shown to the
    /// end user; the decision carries the details for logging.
    Blocked {
        decision: GuardrailDecision,
        message: &'static str,
    },
    /// The turn proceeds with these tagged blocks.
    Proceed {
        blocks: Vec<MessageBlock>,
        /// Remote context identifier recovered from the previous turn.
        context_id: Option<String>,
        /// Language detected by preprocessing, when that stage ran.
        detected_language: Option<String>,
    },
}

/// Wires the guardrail gate and the context pipeline into one entry point.
pub struct Gateway {
    agent_name: String,
    guard: GuardrailGate,
    summarizer: ContextSummarizer,
    preprocessor: Option<Preprocessor>,
}

impl Gateway {
    /// `agent_name` is the author name this gateway writes its own request
    /// events under; it marks the previous turn's boundary in the log.
    pub fn new(
        agent_name: impl Into<String>,
        guard: GuardrailGate,
        summarizer: ContextSummarizer,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            guard,
            summarizer,
            preprocessor: None,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Run the pre-flight pipeline for one turn over the conversation's
    /// event log.
    ///
    /// Ordering matters: the guardrail check sees the raw user input before
    /// any rewriting, and the current-turn message is never summarized away.
    pub async fn prepare_turn(&self, events: &[Event]) -> TurnOutcome {
        let turn_id = Uuid::new_v4();
        let input = latest_user_message(events).unwrap_or_default();

        let decision = self.guard.check(&input).await;
        if let Some(message) = decision.user_message() {
            tracing::warn!(
                %turn_id,
                outcome = ?decision.outcome,
                reasoning = %decision.reasoning,
                "turn blocked"
            );
            return TurnOutcome::Blocked { decision, message };
        }

        let mut consolidation = consolidate(events, &self.agent_name);

        let mut detected_language = None;
        if let Some(preprocessor) = &self.preprocessor {
            if !input.is_empty() {
                let preprocessed = preprocessor.rewrite(&input).await;
                if let Some(current) = consolidation
                    .messages
                    .iter_mut()
                    .rev()
                    .find(|message| message.role == Role::User)
                {
                    if current.text.trim() != preprocessed.query.trim() {
                        current.text = preprocessed.query.clone();
                    }
                }
                detected_language = Some(preprocessed.detected_language);
            }
        }

        let blocks = self.summarizer.prepare(&consolidation.messages).await;

        tracing::debug!(
            %turn_id,
            messages = consolidation.messages.len(),
            blocks = blocks.len(),
            context_id = consolidation.context_id.as_deref(),
            "turn prepared"
        );

        TurnOutcome::Proceed {
            blocks,
            context_id: consolidation.context_id,
            detected_language,
        }
    }
}
