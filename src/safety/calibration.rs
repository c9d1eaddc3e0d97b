//! Probability calibration for classifier log-probabilities.
//!
//! The classifier answers with a single yes/no token, and the endpoint
//! reports the top-K candidate tokens it considered at every generation
//! step. Summing the probability mass of every candidate piece that spells
//! the safe label (and separately the risky label) and pushing the pair
//! through a two-way softmax yields a clean `P(safe) + P(risky) = 1.0`
//! confidence pair, comparable across calls and models.

use crate::llm::types::ChoiceLogprobs;

/// Floor added to each aggregated mass so `ln` never sees zero. Keeps the
/// math finite for raw log-probabilities down to -115 and far beyond.
const PROBABILITY_FLOOR: f64 = 1e-50;

/// Convert two log-probabilities for mutually exclusive outcomes into plain
/// probabilities that add to 1.
///
/// Numerically stable two-way softmax: subtracting the max before
/// exponentiating keeps both exponents at or below zero, so nothing
/// overflows regardless of how negative the inputs are.
pub fn calibrate(log_safe: f64, log_risky: f64) -> (f64, f64) {
    let max = log_safe.max(log_risky);
    let exp_safe = (log_safe - max).exp();
    let exp_risky = (log_risky - max).exp();
    let denominator = exp_safe + exp_risky;
    (exp_safe / denominator, exp_risky / denominator)
}

/// Aggregate the raw probability mass behind each label across every
/// generation step.
///
/// A label can be split into several token pieces internally ("Yes" may
/// arrive as "Y" + "es"), and the same step can surface several casings in
/// its top-K. Every candidate whose trimmed, lowercased text equals the
/// label contributes `exp(logprob)` to that label's mass.
pub fn label_masses(logprobs: &ChoiceLogprobs, safe_label: &str, risky_label: &str) -> (f64, f64) {
    let mut safe_mass = PROBABILITY_FLOOR;
    let mut risky_mass = PROBABILITY_FLOOR;

    for step in &logprobs.content {
        for candidate in &step.top_logprobs {
            let token = candidate.token.trim().to_lowercase();
            if token == safe_label {
                safe_mass += candidate.logprob.exp();
            } else if token == risky_label {
                risky_mass += candidate.logprob.exp();
            }
        }
    }

    (safe_mass, risky_mass)
}
