//! Privilege detection for nmap_core
//!
//! Determines which present options need elevated privileges and whether
//! the command already accounts for that with a `sudo` prefix. This stage
//! is informational: it never blocks validity by itself, the validator's
//! policy decides whether the finding is a warning or an error.

use serde::{Deserialize, Serialize};

use crate::catalog::OptionCatalog;
use crate::syntax::ParsedCommand;

/// Result of the privilege check
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RootCheck {
    /// At least one present option needs elevated privileges
    pub required: bool,
    /// The options that need them, sorted
    pub flags: Vec<String>,
    /// Command carries a sudo prefix
    pub elevated: bool,
}

/// Check which present options require root, per the catalog
pub fn check_privileges(parsed: &ParsedCommand, catalog: &OptionCatalog) -> RootCheck {
    let mut flags: Vec<String> = parsed
        .flags
        .iter()
        .filter(|f| catalog.get(f).map(|o| o.requires_root).unwrap_or(false))
        .cloned()
        .collect();
    flags.sort_unstable();
    flags.dedup();

    RootCheck {
        required: !flags.is_empty(),
        flags,
        elevated: parsed.elevated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OptionCatalog;
    use crate::syntax::SyntaxChecker;

    fn run(command: &str) -> RootCheck {
        let catalog = OptionCatalog::fallback();
        let parsed = SyntaxChecker::new().parse(command, &catalog);
        check_privileges(&parsed, &catalog)
    }

    #[test]
    fn test_no_root_needed() {
        let check = run("nmap -sT -p 80 192.168.1.1");
        assert!(!check.required);
        assert!(check.flags.is_empty());
    }

    #[test]
    fn test_root_flags_detected() {
        let check = run("nmap -sS -O 192.168.1.1");
        assert!(check.required);
        assert_eq!(check.flags, vec!["-O", "-sS"]);
        assert!(!check.elevated);
    }

    #[test]
    fn test_sudo_prefix_detected() {
        let check = run("sudo nmap -sS 192.168.1.1");
        assert!(check.required);
        assert!(check.elevated);
    }

    #[test]
    fn test_repeated_flag_listed_once() {
        let check = run("nmap -sS -sS 192.168.1.1");
        assert_eq!(check.flags, vec!["-sS"]);
    }

    #[test]
    fn test_unknown_flags_ignored() {
        let check = run("nmap --mystery-flag 192.168.1.1");
        assert!(!check.required);
    }
}
