//! Error types shared across the crate.

use std::time::Duration;

use thiserror::Error;

/// Crate-wide result alias. Typed errors below convert into it via `?`.
pub type Result<T> = anyhow::Result<T>;

/// Errors from the OpenAI-compatible completion endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {code}: {body}")]
    Status { code: u16, body: String },

    #[error("failed to decode completion response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("completion call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from a single classifier call.
///
/// Parse failures are never silently defaulted to a safe verdict — a response
/// we cannot read carries no evidence of safety. Each variant is captured per
/// category and fed into the gate's fail-closed logic.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier response contained no log-probabilities")]
    MissingLogprobs,

    #[error("classifier response contained no choices")]
    EmptyResponse,

    #[error("could not extract a yes/no label from classifier response: {0}")]
    UnparsableLabel(String),

    #[error("classifier task aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Call(#[from] LlmError),
}
