//! Validation pipeline for nmap_core
//!
//! `CommandValidator` runs a candidate command through the four stages
//! (syntax, conflicts, safety, privileges) in a fixed order, collects every
//! error and warning, and aggregates them into a scored `ValidationReport`.
//! Stages never short-circuit: a single call always reports the complete
//! error set, and safety runs on the raw string even when syntax fails.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::OptionCatalog;
use crate::conflict;
use crate::decision;
use crate::privilege::{self, RootCheck};
use crate::safety::SafetyChecker;
use crate::syntax::SyntaxChecker;

/// Outcome of a single validation stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageResult {
    pub valid: bool,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl StageResult {
    /// Build a stage result from accumulated errors and warnings. The
    /// message is the first error, or the given pass message when clean.
    pub fn from_findings(pass_message: &str, errors: Vec<String>, warnings: Vec<String>) -> Self {
        let valid = errors.is_empty();
        let message = if valid {
            pass_message.to_string()
        } else {
            errors[0].clone()
        };
        Self {
            valid,
            message,
            errors,
            warnings,
        }
    }
}

/// Per-stage detail block of a validation report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationDetails {
    pub syntax: StageResult,
    pub conflicts: StageResult,
    pub safety: StageResult,
    pub root: RootCheck,
}

/// Aggregate validation outcome for one command
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub score: f64,
    pub feedback: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub details: ValidationDetails,
}

/// How an unelevated root-requiring command is treated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// Warn only (default)
    #[default]
    Warn,
    /// Treat missing elevation as a blocking error
    Error,
}

/// Caller-configurable validation policy
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationPolicy {
    pub root_policy: RootPolicy,
}

/// The validation pipeline. Holds only read-only state and is safe to
/// share across threads.
pub struct CommandValidator {
    catalog: Arc<OptionCatalog>,
    syntax: SyntaxChecker,
    safety: SafetyChecker,
    policy: ValidationPolicy,
}

impl CommandValidator {
    pub fn new(catalog: Arc<OptionCatalog>) -> Self {
        Self::with_policy(catalog, ValidationPolicy::default())
    }

    pub fn with_policy(catalog: Arc<OptionCatalog>, policy: ValidationPolicy) -> Self {
        Self {
            catalog,
            syntax: SyntaxChecker::new(),
            safety: SafetyChecker::new(),
            policy,
        }
    }

    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }

    /// Run the full pipeline on a candidate command
    pub fn validate(&self, command: &str) -> ValidationReport {
        let parsed = self.syntax.parse(command, &self.catalog);

        let syntax = self.syntax.check_parsed(&parsed, &self.catalog);
        let conflicts = conflict::check_conflicts(&parsed, &self.catalog);
        let safety = self.safety.check(command);
        let root = privilege::check_privileges(&parsed, &self.catalog);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for e in &syntax.errors {
            errors.push(format!("Syntax: {}", e));
        }
        for e in &conflicts.errors {
            errors.push(format!("Conflict: {}", e));
        }
        for e in &safety.errors {
            errors.push(format!("Safety: {}", e));
        }

        warnings.extend(syntax.warnings.iter().cloned());
        warnings.extend(conflicts.warnings.iter().cloned());
        warnings.extend(safety.warnings.iter().cloned());

        let mut privilege_errors = 0usize;
        if root.required && !root.elevated {
            let note = format!("Requires root privileges for: {}", root.flags.join(", "));
            match self.policy.root_policy {
                RootPolicy::Warn => warnings.push(note),
                RootPolicy::Error => {
                    errors.push(format!("Privilege: {}", note));
                    privilege_errors += 1;
                }
            }
        }

        let score = decision::score_stages(
            syntax.errors.len(),
            conflicts.errors.len() + privilege_errors,
            safety.errors.len(),
            warnings.len(),
        );
        let valid = errors.is_empty();
        let feedback = decision::feedback(errors.len(), warnings.len());

        ValidationReport {
            valid,
            score,
            feedback,
            errors,
            warnings,
            details: ValidationDetails {
                syntax,
                conflicts,
                safety,
                root,
            },
        }
    }

    /// Fast check: syntax and safety only, no conflict or privilege
    /// lookups. For callers where speed matters more than thoroughness.
    pub fn quick_check(&self, command: &str) -> bool {
        self.syntax.check(command, &self.catalog).valid && self.safety.check(command).valid
    }
}
