//! Syntax checking for nmap_core
//!
//! Validates token-level well-formedness of a candidate command: program
//! token, target presence and format, flag shape. All syntax errors are
//! accumulated and reported together, never just the first one. The
//! tokenizer here also produces the `ParsedCommand` the conflict and
//! privilege stages operate on.

use regex::Regex;

use crate::catalog::OptionCatalog;
use crate::validator::StageResult;

/// Flags whose presence removes the target requirement
const TARGET_EXEMPT_FLAGS: [&str; 2] = ["-iL", "-iR"];

/// A tokenized command: recognized flags, targets, and whether the command
/// is prefixed for elevated execution
#[derive(Clone, Debug)]
pub struct ParsedCommand {
    pub raw: String,
    /// First non-sudo token
    pub program: Option<String>,
    /// Command carries a `sudo` prefix
    pub elevated: bool,
    /// Flag names, normalized (inline `=value` stripped), input order kept
    pub flags: Vec<String>,
    /// Flag tokens exactly as written, for shape checks
    pub flag_tokens: Vec<String>,
    /// Non-flag tokens not consumed as flag arguments
    pub targets: Vec<String>,
}

/// Token-level syntax checker. Regexes are compiled once at construction.
pub struct SyntaxChecker {
    short_flag: Regex,
    long_flag: Regex,
    ipv4: Regex,
    cidr: Regex,
    ipv6: Regex,
    domain: Regex,
    hostname: Regex,
}

impl SyntaxChecker {
    pub fn new() -> Self {
        Self {
            short_flag: Regex::new(r"^-[A-Za-z0-9][A-Za-z0-9-]*$").unwrap(),
            long_flag: Regex::new(r"^--[A-Za-z][A-Za-z0-9-]*(=\S*)?$").unwrap(),
            ipv4: Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap(),
            cidr: Regex::new(r"^(\d{1,3}\.){3}\d{1,3}/\d{1,2}$").unwrap(),
            ipv6: Regex::new(r"^(?:[0-9A-Fa-f]{0,4}:){1,7}[0-9A-Fa-f]{0,4}$").unwrap(),
            domain: Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
                .unwrap(),
            hostname: Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap(),
        }
    }

    /// Tokenize a command. A token following a flag is consumed as that
    /// flag's argument only when the catalog marks the flag as taking one,
    /// so targets after argument-less flags are recognized correctly.
    pub fn parse(&self, raw: &str, catalog: &OptionCatalog) -> ParsedCommand {
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        let mut elevated = false;
        let mut start = 0;
        if tokens.first() == Some(&"sudo") {
            elevated = true;
            start = 1;
        }

        let program = tokens.get(start).map(|s| s.to_string());

        let mut flags = Vec::new();
        let mut flag_tokens = Vec::new();
        let mut targets = Vec::new();

        let mut i = start + 1;
        while i < tokens.len() {
            let token = tokens[i];
            if token.starts_with('-') && token.len() > 1 {
                let name = token.split('=').next().unwrap_or(token).to_string();
                let takes_inline_value = token.contains('=');
                let takes_next_token = !takes_inline_value
                    && catalog.get(&name).map(|o| o.requires_arg).unwrap_or(false);

                flag_tokens.push(token.to_string());
                flags.push(name);

                if takes_next_token && i + 1 < tokens.len() {
                    i += 1;
                }
            } else {
                targets.push(token.to_string());
            }
            i += 1;
        }

        ParsedCommand {
            raw: raw.to_string(),
            program,
            elevated,
            flags,
            flag_tokens,
            targets,
        }
    }

    /// Run the syntax rules on a raw command, accumulating every violation
    pub fn check(&self, raw: &str, catalog: &OptionCatalog) -> StageResult {
        self.check_parsed(&self.parse(raw, catalog), catalog)
    }

    /// Run the syntax rules on an already-parsed command, so callers that
    /// parsed for other stages do not tokenize a second time
    pub fn check_parsed(&self, parsed: &ParsedCommand, catalog: &OptionCatalog) -> StageResult {
        let mut errors = Vec::new();

        if parsed.program.as_deref() != Some("nmap") {
            errors.push("Command must start with 'nmap'".to_string());
        }

        let exempt = parsed
            .flags
            .iter()
            .any(|f| TARGET_EXEMPT_FLAGS.contains(&f.as_str()));
        if parsed.targets.is_empty() && !exempt && parsed.program.as_deref() == Some("nmap") {
            errors.push("No target specified".to_string());
        }

        for target in &parsed.targets {
            if !self.is_valid_target(target) {
                errors.push(format!("Invalid target format: {}", target));
            }
        }

        for token in &parsed.flag_tokens {
            if !self.is_well_formed_flag(token, catalog) {
                errors.push(format!("Malformed flag: {}", token));
            }
        }

        StageResult::from_findings("Syntax valid", errors, vec![])
    }

    /// Whether a flag token has a plausible shape. Short flags are at most
    /// three characters (`-v`, `-sS`, `-T4`, `-p-`); longer single-dash
    /// tokens only pass when they are a known flag followed by a numeric
    /// argument (`-p80`), so run-on tokens like `-sSSS` are rejected.
    fn is_well_formed_flag(&self, token: &str, catalog: &OptionCatalog) -> bool {
        if self.long_flag.is_match(token) {
            return true;
        }
        if !self.short_flag.is_match(token) {
            return false;
        }
        if token.len() <= 3 || catalog.is_known(token) {
            return true;
        }
        let (base, suffix) = token.split_at(2);
        catalog.is_known(base) && suffix.chars().all(|c| c.is_ascii_digit())
    }

    /// Whether a token is a plausible scan target: IPv4 literal, CIDR
    /// block, IPv6 literal, domain name, or bare hostname
    pub fn is_valid_target(&self, target: &str) -> bool {
        if self.ipv4.is_match(target) {
            return target.split('.').all(|o| o.parse::<u8>().is_ok());
        }
        if self.cidr.is_match(target) {
            let (ip, prefix) = target.split_once('/').unwrap();
            return ip.split('.').all(|o| o.parse::<u8>().is_ok())
                && prefix.parse::<u8>().map(|p| p <= 32).unwrap_or(false);
        }
        if target.contains(':') && self.ipv6.is_match(target) {
            return true;
        }
        self.domain.is_match(target) || self.hostname.is_match(target)
    }
}

impl Default for SyntaxChecker {
    fn default() -> Self {
        Self::new()
    }
}
