//! Scoring and final decision for nmap_core
//!
//! The confidence score starts at 1.0 and each finding subtracts a fixed,
//! documented penalty, floored at 0.0. Score and validity are independent
//! signals: a command can be valid with a reduced score (warnings only),
//! but it is never valid while any blocking error is present. The score is
//! a non-increasing function of the weighted error and warning counts.
//!
//! This module also computes the decision layer for generated commands:
//! an overall confidence value, a human-readable explanation, and an
//! execution recommendation.

use crate::generator::Complexity;
use crate::validator::ValidationReport;

/// Penalty per blocking syntax error
pub const SYNTAX_ERROR_PENALTY: f64 = 0.35;
/// Penalty per blocking conflict (or privilege-policy) error
pub const CONFLICT_ERROR_PENALTY: f64 = 0.35;
/// Penalty per blocking safety error; safety violations weigh the most
pub const SAFETY_ERROR_PENALTY: f64 = 0.5;
/// Penalty per warning, from any stage
pub const WARNING_PENALTY: f64 = 0.05;

/// Aggregate the stage findings into a [0.0, 1.0] score
pub fn score_stages(
    syntax_errors: usize,
    conflict_errors: usize,
    safety_errors: usize,
    warnings: usize,
) -> f64 {
    let score = 1.0
        - syntax_errors as f64 * SYNTAX_ERROR_PENALTY
        - conflict_errors as f64 * CONFLICT_ERROR_PENALTY
        - safety_errors as f64 * SAFETY_ERROR_PENALTY
        - warnings as f64 * WARNING_PENALTY;
    score.clamp(0.0, 1.0)
}

/// Templated one-line summary of a validation outcome
pub fn feedback(errors: usize, warnings: usize) -> String {
    if errors == 0 {
        if warnings > 0 {
            format!("Valid command with {} warning(s)", warnings)
        } else {
            "Command is valid and safe".to_string()
        }
    } else {
        format!("Command has {} error(s)", errors)
    }
}

/// Confidence in a generated command, combining validation quality with
/// how hard the command was to produce. Base 0.7, adjusted by validation
/// outcome, retry count, and requested complexity; clamped to [0, 1].
pub fn confidence(validation: &ValidationReport, attempts: usize, complexity: Complexity) -> f64 {
    let mut confidence: f64 = 0.7;

    if validation.valid && validation.score >= 0.9 {
        confidence += 0.2;
    } else if validation.valid && validation.score >= 0.7 {
        confidence += 0.1;
    } else if validation.valid {
        confidence += 0.05;
    } else {
        confidence -= 0.2;
    }

    if !validation.errors.is_empty() {
        confidence -= 0.2;
    }
    if !validation.warnings.is_empty() {
        confidence -= 0.05;
    }

    if attempts > 0 {
        confidence -= (attempts as f64 * 0.05).min(0.15);
    }

    confidence += match complexity {
        Complexity::Easy => 0.1,
        Complexity::Medium => 0.0,
        Complexity::Hard => -0.1,
    };

    confidence.clamp(0.0, 1.0)
}

/// Human-readable explanation of a generation outcome
pub fn explanation(
    validation: &ValidationReport,
    complexity: Complexity,
    attempts: usize,
    corrected: bool,
) -> String {
    let mut parts = Vec::new();

    if validation.valid {
        parts.push(format!("Valid {} complexity command generated", complexity));
    } else {
        parts.push("Generated command has validation issues".to_string());
    }

    if corrected {
        parts.push(format!(
            "Command was regenerated {} time(s) using validation feedback",
            attempts
        ));
    }

    if !validation.errors.is_empty() {
        let mut shown: Vec<&str> = validation.errors.iter().take(2).map(|s| s.as_str()).collect();
        if validation.errors.len() > 2 {
            shown.push("...");
        }
        parts.push(format!("Errors found: {}", shown.join(", ")));
    }
    if !validation.warnings.is_empty() {
        let shown: Vec<&str> = validation
            .warnings
            .iter()
            .take(2)
            .map(|s| s.as_str())
            .collect();
        parts.push(format!("Warnings: {}", shown.join(", ")));
    }

    parts.push(
        match validation.score {
            s if s >= 0.9 => "High confidence in command validity",
            s if s >= 0.7 => "Moderate confidence in command validity",
            s if s >= 0.5 => "Low confidence - review recommended",
            _ => "Very low confidence - manual review required",
        }
        .to_string(),
    );

    format!("{}.", parts.join(". "))
}

/// Execution recommendation derived from the confidence value
pub fn recommendation(confidence: f64) -> &'static str {
    if confidence >= 0.85 {
        "Command appears safe to execute"
    } else if confidence >= 0.7 {
        "Review command before executing"
    } else if confidence >= 0.5 {
        "Carefully review - consider modifying"
    } else {
        "Do not execute - regenerate or create manually"
    }
}
