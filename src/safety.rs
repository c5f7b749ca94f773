//! Safety checking for nmap_core
//!
//! Pattern-matches the raw command string against a blacklist of shell
//! injection and destructive constructs. Runs on the raw string on
//! purpose: a command that fails tokenization must still be screened, so
//! safety is never skipped because of a syntax failure. Also produces
//! non-blocking advisory warnings for noisy or slow scan options.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validator::StageResult;

/// Category of a blacklisted construct
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SafetyCategory {
    /// Output/input redirection operators
    Redirection,
    /// Command chaining operators
    Chaining,
    /// Subshell / command substitution syntax
    Substitution,
    /// Pipe operators
    Pipe,
    /// Embedded destructive system commands
    SystemCommand,
    /// Forbidden NSE script categories
    Script,
}

/// A blacklist entry
#[derive(Clone, Debug)]
pub struct SafetyPattern {
    pub name: String,
    pub pattern: String,
    pub category: SafetyCategory,
}

struct CompiledPattern {
    info: SafetyPattern,
    regex: Regex,
}

/// A matched blacklist construct, with its category for callers that
/// group or filter violations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafetyFinding {
    pub name: String,
    pub category: SafetyCategory,
}

/// Script categories that warrant a warning but do not block
const NOISY_SCRIPT_CATEGORIES: [&str; 4] = ["exploit", "dos", "brute", "broadcast"];

/// The safety checker. Patterns are compiled once at construction.
pub struct SafetyChecker {
    patterns: Vec<CompiledPattern>,
}

impl SafetyChecker {
    pub fn new() -> Self {
        Self::with_patterns(Self::default_patterns())
    }

    pub fn with_patterns(patterns: Vec<SafetyPattern>) -> Self {
        let compiled = patterns
            .into_iter()
            .filter_map(|p| {
                Regex::new(&p.pattern)
                    .ok()
                    .map(|regex| CompiledPattern { info: p, regex })
            })
            .collect();
        Self { patterns: compiled }
    }

    /// Screen a raw command string. Every matched construct is a distinct
    /// blocking error; advisory findings land in warnings.
    pub fn check(&self, raw: &str) -> StageResult {
        let errors = self
            .findings(raw)
            .into_iter()
            .map(|f| format!("{} is not allowed", f.name))
            .collect();

        StageResult::from_findings("Command is safe", errors, self.advisory_warnings(raw))
    }

    /// All blacklisted constructs present in the raw string
    pub fn findings(&self, raw: &str) -> Vec<SafetyFinding> {
        self.patterns
            .iter()
            .filter(|p| p.regex.is_match(raw))
            .map(|p| SafetyFinding {
                name: p.info.name.clone(),
                category: p.info.category,
            })
            .collect()
    }

    /// Whether the raw string contains any blacklisted construct
    pub fn contains_unsafe(&self, raw: &str) -> bool {
        self.patterns.iter().any(|p| p.regex.is_match(raw))
    }

    /// Non-blocking warnings about slow, noisy, or privileged options
    fn advisory_warnings(&self, raw: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        let lower = raw.to_lowercase();
        let has_flag = |flag: &str| {
            raw.split_whitespace()
                .any(|t| t == flag || t.starts_with(&format!("{}=", flag)))
        };

        if has_flag("-T4") || has_flag("-T5") {
            warnings.push("Aggressive timing (-T4/-T5) may be detected".to_string());
        }
        if has_flag("-A") {
            warnings.push("Aggressive scan (-A) enables OS detection and scripts".to_string());
        }
        if has_flag("-p-") {
            warnings.push("Full port scan will take significant time".to_string());
        }
        if has_flag("-sU") {
            warnings.push("UDP scan requires root and is slower".to_string());
        }
        if has_flag("-sV") {
            warnings.push("Version detection increases scan time".to_string());
        }
        if has_flag("-O") {
            warnings.push("OS detection requires root privileges".to_string());
        }
        if lower.contains("--script") {
            if lower.contains("vuln") {
                warnings.push("Vulnerability scripts may trigger IDS/IPS".to_string());
            }
            for category in NOISY_SCRIPT_CATEGORIES {
                if lower.contains(category) {
                    warnings.push(format!("Script category '{}' may be aggressive", category));
                }
            }
        }

        warnings
    }

    /// Default blacklist: shell constructs and destructive commands
    fn default_patterns() -> Vec<SafetyPattern> {
        let entry = |name: &str, pattern: &str, category| SafetyPattern {
            name: name.to_string(),
            pattern: pattern.to_string(),
            category,
        };

        vec![
            entry(
                "Output redirection ('>')",
                r">",
                SafetyCategory::Redirection,
            ),
            entry("Input redirection ('<')", r"<", SafetyCategory::Redirection),
            entry(
                "Command separator (';')",
                r";",
                SafetyCategory::Chaining,
            ),
            entry("AND chaining ('&&')", r"&&", SafetyCategory::Chaining),
            entry(
                "OR chaining ('||')",
                r"\|\|",
                SafetyCategory::Chaining,
            ),
            entry(
                "Pipe operator ('|')",
                r"(?:^|[^|])\|(?:[^|]|$)",
                SafetyCategory::Pipe,
            ),
            entry(
                "Command substitution ('`')",
                r"`",
                SafetyCategory::Substitution,
            ),
            entry(
                "Command substitution ('$(')",
                r"\$\(",
                SafetyCategory::Substitution,
            ),
            entry(
                "Embedded 'rm' command",
                r"\brm\s",
                SafetyCategory::SystemCommand,
            ),
            entry(
                "Embedded 'chmod' command",
                r"\bchmod\s",
                SafetyCategory::SystemCommand,
            ),
            entry(
                "Embedded 'chown' command",
                r"\bchown\s",
                SafetyCategory::SystemCommand,
            ),
            entry(
                "Embedded 'dd' command",
                r"\bdd\s",
                SafetyCategory::SystemCommand,
            ),
            entry(
                "Embedded 'mkfs' command",
                r"\bmkfs",
                SafetyCategory::SystemCommand,
            ),
            entry(
                "Forbidden script category 'malware'",
                r"--script[= ][^ ]*malware",
                SafetyCategory::Script,
            ),
        ]
    }
}

impl Default for SafetyChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_command() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap -sS -p 80 192.168.1.1");
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.message, "Command is safe");
    }

    #[test]
    fn test_output_redirection_blocked() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap 192.168.1.1 > output.txt");
        assert!(!result.valid);
        assert!(result.errors[0].contains("redirection"));
    }

    #[test]
    fn test_pipe_blocked() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap 192.168.1.1 | grep open");
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("Pipe")));
    }

    #[test]
    fn test_chaining_blocked() {
        let checker = SafetyChecker::new();
        for cmd in [
            "nmap 192.168.1.1; rm -rf /",
            "nmap 192.168.1.1 && whoami",
            "nmap 192.168.1.1 || true",
        ] {
            assert!(!checker.check(cmd).valid, "{}", cmd);
        }
    }

    #[test]
    fn test_substitution_blocked() {
        let checker = SafetyChecker::new();
        assert!(!checker.check("nmap `cat targets`").valid);
        assert!(!checker.check("nmap $(cat targets)").valid);
    }

    #[test]
    fn test_forbidden_script_blocked() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap --script malware-check 192.168.1.1");
        assert!(!result.valid);
    }

    #[test]
    fn test_runs_on_malformed_input() {
        // Safety must fire even when the command would fail tokenization
        let checker = SafetyChecker::new();
        let result = checker.check("@@garbage@@ ; rm -rf /");
        assert!(!result.valid);
        assert!(result.errors.len() >= 2);
    }

    #[test]
    fn test_version_detection_warning() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap -sV -p 80,443 192.168.1.1");
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec!["Version detection increases scan time"]
        );
    }

    #[test]
    fn test_multiple_warnings() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap -A -T5 -p- 192.168.1.1");
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_noisy_script_warning() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap --script brute 192.168.1.1");
        assert!(result.valid);
        assert!(result.warnings[0].contains("brute"));
    }

    #[test]
    fn test_findings_carry_categories() {
        let checker = SafetyChecker::new();
        let findings = checker.findings("nmap 10.0.0.1 > out.txt; rm out.txt");

        let categories: Vec<SafetyCategory> = findings.iter().map(|f| f.category).collect();
        assert!(categories.contains(&SafetyCategory::Redirection));
        assert!(categories.contains(&SafetyCategory::Chaining));
        assert!(categories.contains(&SafetyCategory::SystemCommand));
        assert!(checker.findings("nmap 10.0.0.1").is_empty());
    }

    #[test]
    fn test_contains_unsafe() {
        let checker = SafetyChecker::new();
        assert!(checker.contains_unsafe("nmap 10.0.0.1 > out"));
        assert!(!checker.contains_unsafe("nmap 10.0.0.1"));
    }

    #[test]
    fn test_distinct_errors_per_construct() {
        let checker = SafetyChecker::new();
        let result = checker.check("nmap 10.0.0.1 > out.txt; cat out.txt");
        assert!(result.errors.len() >= 2);
    }
}
