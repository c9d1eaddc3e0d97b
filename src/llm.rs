//! OpenAI-compatible completion client and wire types.

pub mod client;
pub mod types;

pub use client::{ChatCompleter, LlmClient};
pub use types::{ChatCompletion, ChatRequest};
