//! Conflict detection for nmap_core
//!
//! Tests every unordered pair of present options against the catalog's
//! conflict adjacency and verifies requirement edges. Conflicts are
//! reported in the canonical (lexicographic) ordering of the pair so the
//! error text is reproducible regardless of token order in the input.

use std::collections::BTreeSet;

use crate::catalog::{canonical_pair, OptionCatalog};
use crate::syntax::ParsedCommand;
use crate::validator::StageResult;

/// Check the present options for mutual exclusions and unmet dependencies
pub fn check_conflicts(parsed: &ParsedCommand, catalog: &OptionCatalog) -> StageResult {
    // BTreeSet: deduplicates repeated flags and fixes iteration order
    let present: BTreeSet<&str> = parsed.flags.iter().map(|f| f.as_str()).collect();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut reported: BTreeSet<(String, String)> = BTreeSet::new();
    for a in &present {
        for b in &present {
            if a < b && catalog.conflict_between(a, b) {
                let (first, second) = canonical_pair(a, b);
                reported.insert((first.to_string(), second.to_string()));
            }
        }
    }
    for (first, second) in &reported {
        errors.push(format!(
            "Conflict detected: {} conflicts with {}",
            first, second
        ));
    }

    // Requirement edges: at least one required counterpart must be present
    for flag in &present {
        let required = catalog.requires_of(flag);
        if !required.is_empty() && !required.iter().any(|r| present.contains(r)) {
            errors.push(format!("{} requires {}", flag, required.join(" or ")));
        }
    }

    if catalog.degraded() {
        warnings.push(
            "Conflict rules evaluated in fallback mode (graph store unavailable)".to_string(),
        );
    }

    StageResult::from_findings("No conflicts detected", errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OptionCatalog;
    use crate::syntax::SyntaxChecker;

    fn run(command: &str, catalog: &OptionCatalog) -> StageResult {
        let parsed = SyntaxChecker::new().parse(command, catalog);
        check_conflicts(&parsed, catalog)
    }

    #[test]
    fn test_no_conflicts() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap -sS -p 80 192.168.1.1", &catalog);
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.message, "No conflicts detected");
    }

    #[test]
    fn test_scan_type_conflict() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap -sS -sT 192.168.1.1", &catalog);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec!["Conflict detected: -sS conflicts with -sT"]
        );
    }

    #[test]
    fn test_conflict_message_order_independent() {
        let catalog = OptionCatalog::fallback();
        let forwards = run("nmap -sS -sT 192.168.1.1", &catalog);
        let backwards = run("nmap -sT -sS 192.168.1.1", &catalog);
        assert_eq!(forwards.errors, backwards.errors);
    }

    #[test]
    fn test_ping_scan_vs_port_spec() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap -sn -p 80 192.168.1.0/24", &catalog);
        assert!(result
            .errors
            .contains(&"Conflict detected: -p conflicts with -sn".to_string()));
    }

    #[test]
    fn test_multiple_conflicts_all_reported() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap -sS -sT -sU 192.168.1.1", &catalog);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_unmet_requirement() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap --script-args=http.useragent=x 192.168.1.1", &catalog);
        assert_eq!(result.errors, vec!["--script-args requires --script"]);
    }

    #[test]
    fn test_requirement_satisfied() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap --script vuln --script-args=x=1 192.168.1.1", &catalog);
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_fallback_warning_only_when_degraded() {
        let catalog = OptionCatalog::fallback();
        let clean = run("nmap -sS 192.168.1.1", &catalog);
        assert!(clean.warnings.is_empty());

        let degraded = OptionCatalog::fallback().mark_degraded();
        let warned = run("nmap -sS 192.168.1.1", &degraded);
        assert_eq!(warned.warnings.len(), 1);
        assert!(warned.warnings[0].contains("fallback"));
        assert!(warned.valid, "fallback is a warning, not an error");
    }

    #[test]
    fn test_repeated_flag_reported_once() {
        let catalog = OptionCatalog::fallback();
        let result = run("nmap -sS -sT -sS 192.168.1.1", &catalog);
        assert_eq!(result.errors.len(), 1);
    }
}
