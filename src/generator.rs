//! Generator boundary for nmap_core
//!
//! The natural-language-to-command model is an external collaborator; its
//! only contract with this core is `CommandGenerator`. A small rule-based
//! `KeywordGenerator` ships with the crate so the pipeline can run without
//! a model backend: it maps intent keywords to option sets gated by the
//! requested complexity.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::OptionCatalog;

/// Requested command complexity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Easy => write!(f, "EASY"),
            Complexity::Medium => write!(f, "MEDIUM"),
            Complexity::Hard => write!(f, "HARD"),
        }
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EASY" => Ok(Complexity::Easy),
            "MEDIUM" => Ok(Complexity::Medium),
            "HARD" => Ok(Complexity::Hard),
            other => Err(format!("unknown complexity: {}", other)),
        }
    }
}

/// Failure of the external generator. Fatal for the current request.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generator unavailable: {0}")]
    Unavailable(String),

    #[error("generation failed: {0}")]
    Failed(String),
}

/// The opaque external function: produce a candidate command for an intent
pub trait CommandGenerator {
    fn generate(&self, intent: &str, complexity: Complexity)
        -> Result<String, GenerationError>;
}

/// Rule-based generator mapping intent keywords to option sets. Lifts a
/// target from the intent when one is present, otherwise uses a
/// configurable default.
pub struct KeywordGenerator {
    catalog: Arc<OptionCatalog>,
    default_target: String,
    target_re: Regex,
}

impl KeywordGenerator {
    pub fn new(catalog: Arc<OptionCatalog>) -> Self {
        Self {
            catalog,
            default_target: "192.168.1.1".to_string(),
            target_re: Regex::new(r"\b(\d{1,3}\.){3}\d{1,3}(/\d{1,2})?\b").unwrap(),
        }
    }

    pub fn with_default_target(mut self, target: &str) -> Self {
        self.default_target = target.to_string();
        self
    }

    fn pick_target(&self, intent: &str) -> String {
        self.target_re
            .find(intent)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| self.default_target.clone())
    }

    fn push_flag(&self, parts: &mut Vec<String>, flag: &str) {
        // Only emit flags the catalog documents
        if self.catalog.is_known(flag) {
            parts.push(flag.to_string());
        }
    }
}

impl CommandGenerator for KeywordGenerator {
    fn generate(
        &self,
        intent: &str,
        complexity: Complexity,
    ) -> Result<String, GenerationError> {
        let lower = intent.to_lowercase();
        let mut parts: Vec<String> = vec!["nmap".to_string()];

        if lower.contains("web") || lower.contains("http") {
            self.push_flag(&mut parts, "-p");
            parts.push("80,443".to_string());
            if complexity != Complexity::Easy {
                self.push_flag(&mut parts, "-sV");
            }
        } else if lower.contains("ssh") {
            self.push_flag(&mut parts, "-p");
            parts.push("22".to_string());
            if complexity != Complexity::Easy {
                self.push_flag(&mut parts, "-sV");
            }
        } else if lower.contains("database") || lower.contains("db") {
            self.push_flag(&mut parts, "-p");
            parts.push("3306,5432".to_string());
            if complexity != Complexity::Easy {
                self.push_flag(&mut parts, "-sV");
            }
        } else if lower.contains("ping") || lower.contains("discover") || lower.contains("alive")
        {
            self.push_flag(&mut parts, "-sn");
        } else if lower.contains("os") || lower.contains("operating system") {
            if complexity == Complexity::Easy {
                self.push_flag(&mut parts, "-F");
            } else {
                self.push_flag(&mut parts, "-O");
                self.push_flag(&mut parts, "-sV");
            }
        } else {
            match complexity {
                Complexity::Easy => self.push_flag(&mut parts, "-F"),
                Complexity::Medium => self.push_flag(&mut parts, "-sV"),
                Complexity::Hard => {
                    self.push_flag(&mut parts, "-sS");
                    self.push_flag(&mut parts, "-sV");
                    self.push_flag(&mut parts, "-T4");
                }
            }
        }

        parts.push(self.pick_target(intent));
        Ok(parts.join(" "))
    }
}
