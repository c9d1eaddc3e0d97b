//! Input safety: risk scoring, calibration, and the guardrail gate.

pub mod calibration;
pub mod categories;
pub mod gate;
pub mod scoring;
pub mod verdict;

pub use categories::RiskCategory;
pub use gate::{GuardrailDecision, GuardrailGate, Outcome};
pub use scoring::{CategoryResult, RiskScorer};
pub use verdict::RiskVerdict;
