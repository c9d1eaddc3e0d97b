//! Event-log consolidation.
//!
//! The raw log for one conversation interleaves user turns, streamed reply
//! fragments, sub-task acknowledgements, and bookkeeping noise from several
//! authors. Consolidation reduces everything since the previous turn
//! boundary to a clean chronological message list: fragments from the same
//! sub-task are merged, streamed chunks from the same author are stitched
//! together, placeholders and empty events are dropped.
//!
//! The walk runs newest-to-oldest with an explicit accumulator so the flush
//! rules stay testable in isolation: a user event always flushes, an
//! author change flushes, and whatever is still accumulated when the walk
//! ends flushes last.

use crate::session::event::{Event, Part, USER_AUTHOR};

/// Message role in the consolidated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

/// One consolidated message. Text is always non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedMessage {
    pub role: Role,
    /// Authoring agent name; `None` for user messages.
    pub author: Option<String>,
    pub text: String,
}

impl ConsolidatedMessage {
    fn user(text: String) -> Self {
        Self { role: Role::User, author: None, text }
    }

    fn agent(author: String, text: String) -> Self {
        Self { role: Role::Agent, author: Some(author), text }
    }
}

/// Consolidation output: chronological messages plus the context identifier
/// recovered from the previous turn's boundary event, if it carried one.
#[derive(Debug, Default)]
pub struct Consolidation {
    pub messages: Vec<ConsolidatedMessage>,
    pub context_id: Option<String>,
}

/// Streaming fragments from one author, collected while walking backward.
/// Parts are therefore in reverse order until flushed.
struct AgentAccumulation {
    author: String,
    reversed_parts: Vec<String>,
}

impl AgentAccumulation {
    fn flush_into(self, messages: &mut Vec<ConsolidatedMessage>) {
        if self.reversed_parts.is_empty() {
            return;
        }
        let text: String = self.reversed_parts.into_iter().rev().collect();
        messages.push(ConsolidatedMessage::agent(self.author, text));
    }
}

/// Consolidate the event log for the agent named `agent_name`.
///
/// Walks from the newest event backward and stops at the first event the
/// agent itself authored — that event closed the previous turn, and its
/// `context_id` (when present) is captured for reuse. Events newer than the
/// boundary are merged per sub-task, then folded into messages.
pub fn consolidate(events: &[Event], agent_name: &str) -> Consolidation {
    // Boundary: the newest event authored by this agent.
    let mut context_id = None;
    let mut turn_start = 0;
    for (index, event) in events.iter().enumerate().rev() {
        if event.author == agent_name {
            context_id = event.context_id().map(String::from);
            turn_start = index + 1;
            break;
        }
    }

    let merged = merge_task_events(events[turn_start..].to_vec());

    let mut messages = Vec::new();
    let mut accumulation: Option<AgentAccumulation> = None;

    for event in merged.iter().rev() {
        if event.parts.is_empty() {
            continue;
        }

        if event.author == USER_AUTHOR {
            // A user turn closes whatever reply was being accumulated.
            if let Some(current) = accumulation.take() {
                current.flush_into(&mut messages);
            }
            let text = event.visible_texts().join(" ");
            if !text.is_empty() {
                messages.push(ConsolidatedMessage::user(text));
            }
            continue;
        }

        let texts: Vec<String> = event
            .visible_texts()
            .into_iter()
            .map(String::from)
            .collect();
        if texts.is_empty() {
            continue;
        }

        match &mut accumulation {
            Some(current) if current.author == event.author => {
                current.reversed_parts.extend(texts);
            }
            _ => {
                if let Some(previous) = accumulation.take() {
                    previous.flush_into(&mut messages);
                }
                accumulation = Some(AgentAccumulation {
                    author: event.author.clone(),
                    reversed_parts: texts,
                });
            }
        }
    }

    if let Some(trailing) = accumulation.take() {
        trailing.flush_into(&mut messages);
    }

    messages.reverse();
    Consolidation { messages, context_id }
}

/// Merge consecutive events from the same author that share a sub-task
/// identifier into one event whose single text part concatenates all their
/// text parts in chronological order.
///
/// Events without a task identifier never merge with neighbors; empty
/// submitted-task placeholders are dropped outright.
pub fn merge_task_events(events: Vec<Event>) -> Vec<Event> {
    let mut processed: Vec<Event> = Vec::with_capacity(events.len());
    let mut same_task: Vec<Event> = Vec::new();
    let mut current_author: Option<String> = None;
    let mut current_task: Option<String> = None;

    for event in events {
        if event.is_empty_submitted_task() {
            continue;
        }

        let task_id = event.task_id().map(String::from);
        let continues_run = task_id.is_some()
            && task_id == current_task
            && current_author.as_deref() == Some(event.author.as_str());

        if continues_run {
            same_task.push(event);
            continue;
        }

        if let Some(merged) = merge_text_parts(std::mem::take(&mut same_task)) {
            processed.push(merged);
        }

        if task_id.is_some() {
            current_author = Some(event.author.clone());
            current_task = task_id;
            same_task.push(event);
        } else {
            current_author = None;
            current_task = None;
            processed.push(event);
        }
    }

    if let Some(merged) = merge_text_parts(same_task) {
        processed.push(merged);
    }

    processed
}

/// Collapse a run of events into its first event carrying one concatenated
/// text part. The first event keeps its author, timestamp, and metadata.
fn merge_text_parts(mut events: Vec<Event>) -> Option<Event> {
    if events.is_empty() {
        return None;
    }

    let mut text = String::new();
    for event in &events {
        for part in &event.parts {
            text.push_str(part.raw_text());
        }
    }

    let mut base = events.swap_remove(0);
    if !text.is_empty() {
        base.parts = vec![Part::text(text)];
    }
    Some(base)
}
