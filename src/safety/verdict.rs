//! Classifier response parsing.
//!
//! A classifier response carries two separable signals: the text answer (a
//! yes/no label, possibly wrapped in a `<score>` tag depending on model
//! generation) and the token log-probabilities behind it. The label decides
//! `is_risky`; the calibrated confidences decide thresholding and ranking.
//! The two can disagree — a "yes" label with low risky confidence is a real
//! state, and both signals are kept as-is.

use crate::error::ClassifierError;
use crate::llm::types::ChatCompletion;
use crate::safety::calibration::{calibrate, label_masses};

use regex::Regex;
use std::sync::LazyLock;

/// Token text the classifier uses for a safe answer.
pub const SAFE_LABEL: &str = "no";
/// Token text the classifier uses for a risky answer.
pub const RISKY_LABEL: &str = "yes";

// Newer classifier revisions answer "<think>...</think>\n<score> yes </score>";
// older ones put a bare "Yes"/"No" on its own line. Tag form is tried first.
static SCORE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<score>\s*(yes|no)\s*</score>").expect("hardcoded regex"));
static BARE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(yes|no)\s*$").expect("hardcoded regex"));

/// A parsed classifier verdict.
///
/// `is_risky` is set by the classifier's text answer alone; the confidences
/// come from log-probability calibration. Only the label drives blocking,
/// while the risky confidence is what gets compared against the category
/// threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskVerdict {
    pub is_risky: bool,
    pub safe_confidence: f64,
    pub risky_confidence: f64,
}

/// Parse one classifier response into a [`RiskVerdict`].
///
/// Fails when no label can be extracted or when log-probability data is
/// absent or empty — a response without probabilities carries no usable
/// evidence and must not default to safe.
pub fn parse_verdict(completion: &ChatCompletion) -> Result<RiskVerdict, ClassifierError> {
    let choice = completion
        .choices
        .first()
        .ok_or(ClassifierError::EmptyResponse)?;
    let content = choice.message.content.as_deref().unwrap_or("");

    let label = extract_label(content).ok_or_else(|| {
        let preview: String = content.chars().take(200).collect();
        ClassifierError::UnparsableLabel(preview)
    })?;

    let logprobs = choice
        .logprobs
        .as_ref()
        .filter(|data| !data.content.is_empty())
        .ok_or(ClassifierError::MissingLogprobs)?;

    let (safe_mass, risky_mass) = label_masses(logprobs, SAFE_LABEL, RISKY_LABEL);
    let (safe_confidence, risky_confidence) = calibrate(safe_mass.ln(), risky_mass.ln());

    Ok(RiskVerdict {
        is_risky: label == RISKY_LABEL,
        safe_confidence: round4(safe_confidence),
        risky_confidence: round4(risky_confidence),
    })
}

/// Extract the normalized yes/no label from response text: `<score>` tag
/// first, then a bare label alone on a line.
fn extract_label(content: &str) -> Option<String> {
    SCORE_TAG
        .captures(content)
        .or_else(|| BARE_LINE.captures(content))
        .map(|captures| captures[1].trim().to_lowercase())
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{
        AssistantMessage, Choice, ChoiceLogprobs, TokenLogprob, TopLogprob,
    };

    fn completion(content: &str, logprobs: Option<ChoiceLogprobs>) -> ChatCompletion {
        ChatCompletion {
            choices: vec![Choice {
                message: AssistantMessage {
                    content: Some(content.to_string()),
                },
                logprobs,
            }],
        }
    }

    fn label_logprobs(safe_mass: f64, risky_mass: f64) -> ChoiceLogprobs {
        ChoiceLogprobs {
            content: vec![TokenLogprob {
                token: "No".into(),
                logprob: safe_mass.ln(),
                top_logprobs: vec![
                    TopLogprob { token: "No".into(), logprob: safe_mass.ln() },
                    TopLogprob { token: "Yes".into(), logprob: risky_mass.ln() },
                ],
            }],
        }
    }

    /// The tagged form yields a risky verdict.
    #[test]
    fn score_tag_parses_as_risky() {
        let completion = completion(
            "<think>\n</think>\n<score> yes </score>",
            Some(label_logprobs(0.3, 0.7)),
        );

        let verdict = parse_verdict(&completion).expect("verdict parses");
        assert!(verdict.is_risky);
        assert!((verdict.risky_confidence - 0.7).abs() < 1e-3);
    }

    /// A bare "Yes" on its own line also yields a risky verdict.
    #[test]
    fn bare_line_parses_as_risky() {
        let completion = completion(
            "Yes\n<confidence>High</confidence>",
            Some(label_logprobs(0.2, 0.8)),
        );

        let verdict = parse_verdict(&completion).expect("verdict parses");
        assert!(verdict.is_risky);
    }

    /// Text with neither pattern is a parse failure, never a default.
    #[test]
    fn missing_label_is_an_error() {
        let completion = completion("I refuse to answer.", Some(label_logprobs(0.5, 0.5)));

        assert!(matches!(
            parse_verdict(&completion),
            Err(ClassifierError::UnparsableLabel(_))
        ));
    }

    /// Absent or empty logprob data is a hard failure.
    #[test]
    fn missing_logprobs_is_an_error() {
        let without = completion("<score> no </score>", None);
        let empty = completion("<score> no </score>", Some(ChoiceLogprobs::default()));

        assert!(matches!(parse_verdict(&without), Err(ClassifierError::MissingLogprobs)));
        assert!(matches!(parse_verdict(&empty), Err(ClassifierError::MissingLogprobs)));
    }

    /// Raw masses 0.9 safe / 0.1 risky normalize to risky_confidence 0.1.
    #[test]
    fn confidences_come_from_calibrated_masses() {
        let completion = completion("<score> no </score>", Some(label_logprobs(0.9, 0.1)));

        let verdict = parse_verdict(&completion).expect("verdict parses");
        assert!(!verdict.is_risky);
        assert!((verdict.risky_confidence - 0.1).abs() < 1e-4);
        assert!((verdict.safe_confidence + verdict.risky_confidence - 1.0).abs() < 1e-9);
    }

    /// The label decides `is_risky` even when the confidence disagrees.
    #[test]
    fn label_wins_over_confidence() {
        let completion = completion("<score> yes </score>", Some(label_logprobs(0.9, 0.1)));

        let verdict = parse_verdict(&completion).expect("verdict parses");
        assert!(verdict.is_risky);
        assert!(verdict.risky_confidence < 0.5);
    }
}
