//! The conversation event model.
//!
//! Events are immutable records in an append-only, multi-author log owned
//! by the caller; this crate only ever reads them. Content is an ordered
//! list of parts, each either plain text or an explicitly-marked thought.
//! Metadata optionally carries a sub-task identifier, a context identifier,
//! and a remote response envelope from a delegated agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author name under which end-user turns are recorded in the event log.
pub const USER_AUTHOR: &str = "user";

/// One immutable record in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub author: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
}

/// One content part: either plain text or an explicitly-marked thought.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    Thought { text: String },
}

impl Part {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { text: content.into() }
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self::Thought { text: content.into() }
    }

    /// The text of a plain part; `None` for thoughts.
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Thought { .. } => None,
        }
    }

    /// The text of a thought part; `None` for plain text.
    pub fn thought_text(&self) -> Option<&str> {
        match self {
            Self::Thought { text } => Some(text),
            Self::Text { .. } => None,
        }
    }

    /// The raw text of either variant.
    pub fn raw_text(&self) -> &str {
        match self {
            Self::Text { text } | Self::Thought { text } => text,
        }
    }
}

/// Structured metadata attached to an event. Fields this crate does not
/// know about are preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Context identifier from a previous remote invocation, reused on the
    /// next request to the same collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// Stable sub-task identifier; streaming fragments sharing one merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Remote response envelope from a delegated agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RemoteResponse>,
    /// Error reported by the remote side for this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Minimal typed view of a remote-agent response envelope. The concrete
/// wire protocol stays the caller's concern; this models just enough to
/// extract text and recognize bookkeeping placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteResponse {
    Task(RemoteTask),
    Message(RemoteMessage),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTask {
    pub state: TaskState,
    #[serde(default)]
    pub artifacts: Vec<RemoteMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<RemoteMessage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    #[default]
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteMessage {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Event {
    pub fn new(author: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            author: author.into(),
            timestamp: Utc::now(),
            parts,
            metadata: None,
        }
    }

    /// A plain user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(USER_AUTHOR, vec![Part::text(text)])
    }

    /// A plain single-text event from a named agent.
    pub fn agent(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, vec![Part::text(text)])
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn task_id(&self) -> Option<&str> {
        self.metadata.as_ref()?.task_id.as_deref()
    }

    pub fn context_id(&self) -> Option<&str> {
        self.metadata.as_ref()?.context_id.as_deref()
    }

    /// Non-thought text parts, in order.
    pub fn visible_texts(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(Part::visible_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// A newly-created sub-task acknowledgement that carried nothing: state
    /// `submitted`, no artifacts, no status message. Pure bookkeeping noise
    /// that would otherwise duplicate earlier context.
    pub fn is_empty_submitted_task(&self) -> bool {
        let Some(RemoteResponse::Task(task)) =
            self.metadata.as_ref().and_then(|metadata| metadata.response.as_ref())
        else {
            return false;
        };
        task.state == TaskState::Submitted
            && task.artifacts.is_empty()
            && task.status_message.is_none()
    }

    /// Response text for this event.
    ///
    /// Checks the remote error first, then the remote envelope (first task
    /// artifact, else the task status message, else the message parts), and
    /// only falls back to the event's own non-thought parts when no envelope
    /// is present.
    pub fn response_text(&self) -> Option<String> {
        if let Some(metadata) = &self.metadata {
            if let Some(error) = &metadata.error {
                return Some(error.clone());
            }
            if let Some(response) = &metadata.response {
                return match response {
                    RemoteResponse::Task(task) => {
                        if let Some(artifact) = task.artifacts.first() {
                            joined_visible_text(&artifact.parts)
                        } else if let Some(message) = &task.status_message {
                            joined_visible_text(&message.parts)
                        } else {
                            None
                        }
                    }
                    RemoteResponse::Message(message) => joined_visible_text(&message.parts),
                };
            }
        }

        joined_visible_text(&self.parts)
    }

    /// Thinking text for this event: thought parts only, and never from an
    /// event carrying a remote envelope (remote responses hold no thinking).
    pub fn thinking_text(&self) -> Option<String> {
        if self
            .metadata
            .as_ref()
            .is_some_and(|metadata| metadata.response.is_some())
        {
            return None;
        }

        let text: String = self.parts.iter().filter_map(Part::thought_text).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

fn joined_visible_text(parts: &[Part]) -> Option<String> {
    let text: String = parts.iter().filter_map(Part::visible_text).collect();
    if text.is_empty() { None } else { Some(text) }
}

/// The last chronological user-authored message with any visible text,
/// joined across its parts.
pub fn latest_user_message(events: &[Event]) -> Option<String> {
    events
        .iter()
        .rev()
        .filter(|event| event.author == USER_AUTHOR)
        .find_map(|event| {
            let texts = event.visible_texts();
            if texts.is_empty() { None } else { Some(texts.join(" ")) }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_event(state: TaskState, artifacts: Vec<RemoteMessage>) -> Event {
        Event::new("searcher", vec![]).with_metadata(EventMetadata {
            task_id: Some("task-1".into()),
            response: Some(RemoteResponse::Task(RemoteTask {
                state,
                artifacts,
                status_message: None,
            })),
            ..Default::default()
        })
    }

    /// The envelope wins over the event's own parts.
    #[test]
    fn response_text_prefers_envelope() {
        let event = Event::new("searcher", vec![Part::text("local")]).with_metadata(EventMetadata {
            response: Some(RemoteResponse::Message(RemoteMessage {
                parts: vec![Part::text("remote answer")],
            })),
            ..Default::default()
        });

        assert_eq!(event.response_text().as_deref(), Some("remote answer"));
    }

    /// A remote error string wins over everything else.
    #[test]
    fn response_text_prefers_error() {
        let event = Event::agent("searcher", "content").with_metadata(EventMetadata {
            error: Some("remote agent failed".into()),
            ..Default::default()
        });

        assert_eq!(event.response_text().as_deref(), Some("remote agent failed"));
    }

    /// Task envelopes read the first artifact; thought parts are excluded.
    #[test]
    fn response_text_reads_first_artifact() {
        let event = task_event(
            TaskState::Completed,
            vec![RemoteMessage {
                parts: vec![Part::thought("pondering"), Part::text("found it")],
            }],
        );

        assert_eq!(event.response_text().as_deref(), Some("found it"));
    }

    /// Thinking never comes from an envelope-carrying event.
    #[test]
    fn thinking_excluded_for_remote_events() {
        let mut event = task_event(TaskState::Completed, vec![]);
        event.parts = vec![Part::thought("local thought")];

        assert_eq!(event.thinking_text(), None);

        let plain = Event::new("router", vec![Part::thought("a"), Part::text("b"), Part::thought("c")]);
        assert_eq!(plain.thinking_text().as_deref(), Some("ac"));
    }

    /// Submitted tasks with no payload are placeholders; any payload or a
    /// later state is not.
    #[test]
    fn empty_submitted_task_detection() {
        assert!(task_event(TaskState::Submitted, vec![]).is_empty_submitted_task());
        assert!(!task_event(TaskState::Working, vec![]).is_empty_submitted_task());
        assert!(
            !task_event(
                TaskState::Submitted,
                vec![RemoteMessage { parts: vec![Part::text("partial")] }]
            )
            .is_empty_submitted_task()
        );
        assert!(!Event::user("hello").is_empty_submitted_task());
    }

    /// The latest user message skips newer agent events.
    #[test]
    fn latest_user_message_scans_backward() {
        let events = vec![
            Event::user("first question"),
            Event::agent("router", "answer"),
            Event::user("second question"),
            Event::agent("router", "partial"),
        ];

        assert_eq!(
            latest_user_message(&events).as_deref(),
            Some("second question")
        );
        assert_eq!(latest_user_message(&[]), None);
    }

    /// Events round-trip through the JSON shape external logs use.
    #[test]
    fn event_deserializes_from_json() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "author": "searcher",
            "timestamp": "2026-03-01T12:00:00Z",
            "parts": [
                {"kind": "thought", "text": "hmm"},
                {"kind": "text", "text": "result"}
            ],
            "metadata": {
                "task_id": "t-42",
                "trace": "abc"
            }
        }))
        .expect("event parses");

        assert_eq!(event.task_id(), Some("t-42"));
        assert_eq!(event.visible_texts(), vec!["result"]);
        assert_eq!(
            event.metadata.unwrap().extra.get("trace"),
            Some(&serde_json::Value::String("abc".into()))
        );
    }
}
