//! Self-correction loop for nmap_core
//!
//! Drives generate-validate-retry as an explicit state machine. Each
//! candidate command is validated in full; when blocking errors remain and
//! the retry budget is not spent, the error messages are folded back into
//! the intent as correction hints and the generator is asked again. Hints
//! accumulate across rounds, so a regeneration cannot flip back to an
//! earlier mistake the loop has already diagnosed.
//! Running out of retries is a reportable outcome, not a failure: the loop
//! returns the last candidate with its validation attached so the caller
//! can decide what to do with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision;
use crate::generator::{CommandGenerator, Complexity, GenerationError};
use crate::validator::{CommandValidator, ValidationReport};

/// Loop phase, advanced one transition at a time. The loop only ever
/// cycles between the first two; the terminal states carry the result out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Generating,
    Validating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopEnd {
    Succeeded,
    Exhausted,
}

/// One generate-validate round, recorded for the audit trail
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrectionAttempt {
    /// Zero-based: 0 is the initial generation, 1+ are regenerations
    pub attempt: usize,
    pub command: String,
    pub validation: ValidationReport,
    /// Hints handed to the next round, empty on the final attempt
    pub hints_for_next: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Summary counters attached to the outcome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrectionMetadata {
    pub complexity: Complexity,
    /// Number of regenerations performed (0 = first candidate accepted)
    pub attempts: usize,
    /// Whether any regeneration happened
    pub corrected: bool,
}

/// Final product of the loop: the best candidate plus the decision layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub command: String,
    pub confidence: f64,
    pub explanation: String,
    pub recommendation: String,
    pub validation: ValidationReport,
    pub metadata: CorrectionMetadata,
    pub history: Vec<CorrectionAttempt>,
}

/// Fatal loop failure. Validation problems are never errors here, only
/// generator failures and cancellation are.
#[derive(Debug, thiserror::Error)]
pub enum CorrectionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("correction loop cancelled")]
    Cancelled,
}

/// Cooperative cancellation handle, checked before each generation
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The retry loop itself. Stateless across runs; only the budget is held.
pub struct SelfCorrector {
    max_retries: usize,
}

impl Default for SelfCorrector {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl SelfCorrector {
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }

    pub fn run(
        &self,
        intent: &str,
        complexity: Complexity,
        generator: &dyn CommandGenerator,
        validator: &CommandValidator,
    ) -> Result<CorrectionOutcome, CorrectionError> {
        self.run_with_cancel(intent, complexity, generator, validator, &CancelToken::new())
    }

    /// Run the loop with a cancellation handle. Performs at most
    /// `max_retries + 1` generation calls.
    pub fn run_with_cancel(
        &self,
        intent: &str,
        complexity: Complexity,
        generator: &dyn CommandGenerator,
        validator: &CommandValidator,
        cancel: &CancelToken,
    ) -> Result<CorrectionOutcome, CorrectionError> {
        let mut state = LoopState::Generating;
        let mut current_intent = intent.to_string();
        let mut attempt = 0usize;
        let mut history: Vec<CorrectionAttempt> = Vec::new();
        let mut candidate = String::new();
        let mut hints: Vec<String> = Vec::new();

        let (final_report, final_state) = loop {
            match state {
                LoopState::Generating => {
                    if cancel.is_cancelled() {
                        return Err(CorrectionError::Cancelled);
                    }
                    candidate = generator.generate(&current_intent, complexity)?;
                    debug!(attempt, command = %candidate, "generated candidate");
                    state = LoopState::Validating;
                }
                LoopState::Validating => {
                    let report = validator.validate(&candidate);
                    if report.valid {
                        history.push(CorrectionAttempt {
                            attempt,
                            command: candidate.clone(),
                            validation: report.clone(),
                            hints_for_next: Vec::new(),
                            timestamp: Utc::now(),
                        });
                        break (report, LoopEnd::Succeeded);
                    } else if attempt < self.max_retries {
                        merge_hints(&mut hints, &report.errors);
                        debug!(
                            attempt,
                            errors = report.errors.len(),
                            "candidate rejected, retrying"
                        );
                        history.push(CorrectionAttempt {
                            attempt,
                            command: candidate.clone(),
                            validation: report,
                            hints_for_next: hints.clone(),
                            timestamp: Utc::now(),
                        });
                        current_intent = amend_intent(intent, &hints);
                        attempt += 1;
                        state = LoopState::Generating;
                    } else {
                        history.push(CorrectionAttempt {
                            attempt,
                            command: candidate.clone(),
                            validation: report.clone(),
                            hints_for_next: Vec::new(),
                            timestamp: Utc::now(),
                        });
                        break (report, LoopEnd::Exhausted);
                    }
                }
            }
        };

        debug!(?final_state, attempt, "correction loop finished");
        let corrected = attempt > 0;
        let confidence = decision::confidence(&final_report, attempt, complexity);
        let explanation = decision::explanation(&final_report, complexity, attempt, corrected);
        let recommendation = decision::recommendation(confidence).to_string();

        Ok(CorrectionOutcome {
            command: candidate,
            confidence,
            explanation,
            recommendation,
            validation: final_report,
            metadata: CorrectionMetadata {
                complexity,
                attempts: attempt,
                corrected,
            },
            history,
        })
    }
}

/// Add the latest blocking error messages to the accumulated hint set,
/// keeping first-seen order and dropping duplicates
fn merge_hints(hints: &mut Vec<String>, errors: &[String]) {
    for error in errors {
        if !hints.iter().any(|h| h == error) {
            hints.push(error.clone());
        }
    }
}

/// Fold the accumulated hints into a fresh copy of the original intent.
/// The amendment is rebuilt from the original each round, so hints grow as
/// a flat list rather than nesting.
fn amend_intent(intent: &str, hints: &[String]) -> String {
    if hints.is_empty() {
        return intent.to_string();
    }
    format!("{} (fix: {})", intent, hints.join("; "))
}
