//! Per-turn safety gating and bounded context preparation for multi-agent
//! chat gateways.
//!
//! Two subsystems do the real work. The safety side ([`safety`]) scores raw
//! user input against a set of risk categories by fanning out classifier
//! calls, calibrating their token log-probabilities into confidences, and
//! collapsing the results into a single allow/block decision. The session
//! side ([`session`]) consolidates an append-only multi-agent event log into
//! chronological messages, summarizes long histories into a bounded context
//! block, and folds streaming replies into a buffered response.
//!
//! [`gateway::Gateway`] wires both sides into a per-turn pipeline. Storage,
//! HTTP routing, and the downstream responder itself are the caller's
//! problem — everything here is request-scoped and stateless between turns.

pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod logging;
pub mod preprocess;
pub mod safety;
pub mod session;

pub use config::Config;
pub use error::Result;
pub use gateway::{Gateway, TurnOutcome};
pub use session::event::{Event, Part, USER_AUTHOR};
