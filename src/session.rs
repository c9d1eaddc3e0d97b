//! Session event model, consolidation, and context preparation.

pub mod consolidate;
pub mod context;
pub mod event;
pub mod stream;

pub use consolidate::{consolidate, merge_task_events, ConsolidatedMessage, Consolidation, Role};
pub use context::{BlockKind, ContextSummarizer, MessageBlock};
pub use event::{latest_user_message, Event, EventMetadata, Part, RemoteResponse};
pub use stream::{current_turn_response, BufferedResponse, StreamAggregator, StreamItem};
