//! Streaming response aggregation.
//!
//! Callers that don't want an event stream get a single
//! [`BufferedResponse`]: every partial event's response text and thinking
//! text folded into two buffers, strictly in arrival order. Nothing is
//! reordered, truncated, or deduplicated here — duplicate suppression is
//! the history-rendering path's job, not the live stream's.

use crate::session::event::{Event, USER_AUTHOR};

use std::collections::HashMap;
use tokio::sync::mpsc;

/// One item of a live response stream. `Done` is the explicit terminal
/// marker; an exhausted channel terminates the stream the same way.
#[derive(Debug)]
pub enum StreamItem {
    Event(Event),
    Done,
}

/// The fully-buffered form of one turn's streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    pub content: String,
    pub thinking: String,
}

/// Folds partial response events into a [`BufferedResponse`].
#[derive(Debug, Default)]
pub struct StreamAggregator {
    response: BufferedResponse,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the buffers, appending in arrival order.
    pub fn absorb(&mut self, event: &Event) {
        if let Some(thinking) = event.thinking_text() {
            self.response.thinking.push_str(&thinking);
        }
        if let Some(content) = event.response_text() {
            self.response.content.push_str(&content);
        }
    }

    pub fn finish(self) -> BufferedResponse {
        self.response
    }

    /// Drain a live stream to completion and return the buffered response.
    pub async fn collect(mut receiver: mpsc::Receiver<StreamItem>) -> BufferedResponse {
        let mut aggregator = Self::new();
        while let Some(item) = receiver.recv().await {
            match item {
                StreamItem::Event(event) => aggregator.absorb(&event),
                StreamItem::Done => break,
            }
        }
        aggregator.finish()
    }
}

/// Whether a stream event carries answer content or is a progress ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventKind {
    Content,
    Progress,
}

/// Maps event authors to the labels shown while their work is in flight.
/// Events from `content_author` are the answer itself; everything else is
/// progress.
#[derive(Debug, Clone, Default)]
pub struct StageLabels {
    pub content_author: String,
    pub progress: HashMap<String, String>,
}

impl StageLabels {
    /// Classify an event author into content/progress plus an optional
    /// human-readable progress line.
    pub fn classify(&self, author: &str) -> (StreamEventKind, Option<String>) {
        if author.trim().is_empty() {
            tracing::warn!("empty author on stream event");
            return (StreamEventKind::Progress, Some("Processing...".into()));
        }
        if author == self.content_author {
            return (StreamEventKind::Content, None);
        }
        match self.progress.get(author) {
            Some(label) => (StreamEventKind::Progress, Some(label.clone())),
            None => (
                StreamEventKind::Progress,
                Some(format!("Processing ({author})...")),
            ),
        }
    }
}

/// Aggregate the current turn's response straight from the event log.
///
/// Finds the last user-authored event and concatenates the envelope-aware
/// response text of every later event from one of the named responders,
/// skipping forwarded context blocks. Event-level errors from any author
/// win over content. Used by callers that replay a finished turn instead
/// of consuming the live stream.
pub fn current_turn_response(events: &[Event], responders: &[String]) -> String {
    if events.is_empty() {
        return "No session data available".into();
    }

    let Some(last_user_index) = events.iter().rposition(|event| event.author == USER_AUTHOR)
    else {
        return "No user message found in conversation".into();
    };

    let mut response_parts: Vec<String> = Vec::new();
    let mut error_messages: Vec<String> = Vec::new();

    for event in &events[last_user_index + 1..] {
        if let Some(error) = event.metadata.as_ref().and_then(|m| m.error.clone()) {
            tracing::error!(author = %event.author, error = %error, "error event in current turn");
            error_messages.push(error);
        }

        if !responders.iter().any(|name| name == &event.author) {
            continue;
        }
        let Some(text) = event.response_text() else {
            continue;
        };
        // Forwarded context blocks are request scaffolding, not answer text.
        if text.trim_start().starts_with("For context:") {
            continue;
        }
        response_parts.push(text);
    }

    if !error_messages.is_empty() {
        return format!("Error occurred: {}", error_messages.join(" | "));
    }

    let response = response_parts.concat();
    if response.is_empty() {
        return "No response generated".into();
    }
    response
}
