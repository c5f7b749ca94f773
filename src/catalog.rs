//! Nmap option catalog for nmap_core
//!
//! Immutable registry of known nmap options with their conflict and
//! dependency edges. Built once at process start, either from the graph
//! store or from the bundled fallback table, then shared read-only across
//! concurrent validation requests. Conflict and requirement checks are
//! set-membership tests against precomputed adjacency maps, not live
//! queries.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Context;

/// Category of an nmap option
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionCategory {
    ScanType,
    PortSpec,
    ServiceDetection,
    OsDetection,
    Timing,
    Scripting,
    Output,
    Discovery,
    Dns,
    Misc,
}

impl OptionCategory {
    /// Parse a category label as stored in the graph. Labels the store
    /// uses but this enum does not (e.g. AGGRESSIVE) map to Misc.
    pub fn from_label(label: &str) -> Self {
        match label {
            "SCAN_TYPE" => OptionCategory::ScanType,
            "PORT_SPEC" => OptionCategory::PortSpec,
            "SERVICE_DETECTION" => OptionCategory::ServiceDetection,
            "OS_DETECTION" => OptionCategory::OsDetection,
            "TIMING" => OptionCategory::Timing,
            "SCRIPTING" => OptionCategory::Scripting,
            "OUTPUT" => OptionCategory::Output,
            "DISCOVERY" | "HOST_DISCOVERY" => OptionCategory::Discovery,
            "DNS" => OptionCategory::Dns,
            _ => OptionCategory::Misc,
        }
    }
}

/// A known nmap option/flag with its metadata and relationship edges
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NmapOption {
    /// The flag token, e.g. "-sS" or "--script"
    pub name: String,
    pub category: OptionCategory,
    pub description: String,
    /// Whether the option needs elevated privileges to run
    pub requires_root: bool,
    /// Whether the option consumes the following token as its argument
    pub requires_arg: bool,
    /// Flags that must not appear together with this one (symmetric)
    #[serde(default)]
    pub conflicts_with: Vec<String>,
    /// Flags at least one of which must be present when this one is (directed)
    #[serde(default)]
    pub requires: Vec<String>,
    /// Example invocation
    #[serde(default)]
    pub example: Option<String>,
}

/// Auxiliary service entry from the graph store (name/port lookups).
/// Not consulted by validation logic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub description: String,
}

/// Which backing source the catalog was built from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Loaded from the graph store
    Graph,
    /// Bundled static rule table (graph store unreachable)
    Fallback,
}

/// Raw catalog contents before adjacency maps are built
#[derive(Clone, Debug, Default)]
pub struct CatalogData {
    pub options: Vec<NmapOption>,
    pub services: Vec<Service>,
}

/// The option catalog: option metadata plus precomputed conflict and
/// requirement adjacency. Immutable after construction.
pub struct OptionCatalog {
    options: HashMap<String, NmapOption>,
    conflicts: HashMap<String, HashSet<String>>,
    requires: HashMap<String, HashSet<String>>,
    services: Vec<Service>,
    mode: CatalogMode,
    degraded: bool,
}

impl OptionCatalog {
    /// Build a catalog from raw data. The conflict relation is closed
    /// under symmetry here: an edge listed on either endpoint ends up on
    /// both.
    pub fn from_data(data: CatalogData, mode: CatalogMode) -> Self {
        let mut options = HashMap::new();
        let mut conflicts: HashMap<String, HashSet<String>> = HashMap::new();
        let mut requires: HashMap<String, HashSet<String>> = HashMap::new();

        for opt in &data.options {
            for other in &opt.conflicts_with {
                conflicts
                    .entry(opt.name.clone())
                    .or_default()
                    .insert(other.clone());
                conflicts
                    .entry(other.clone())
                    .or_default()
                    .insert(opt.name.clone());
            }
            for req in &opt.requires {
                requires
                    .entry(opt.name.clone())
                    .or_default()
                    .insert(req.clone());
            }
            options.insert(opt.name.clone(), opt.clone());
        }

        Self {
            options,
            conflicts,
            requires,
            services: data.services,
            mode,
            degraded: false,
        }
    }

    /// Mark this catalog as the result of a failed graph-store load.
    /// Degraded catalogs cause the conflict stage to record a fallback
    /// warning on every request.
    pub fn mark_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Whether a configured graph store was unreachable at load time
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Bundled fallback catalog. This table is the minimal correctness
    /// contract: every documented conflict/requirement edge must be
    /// representable here, so fallback mode is never weaker than the graph
    /// for known option pairs.
    pub fn fallback() -> Self {
        Self::from_data(fallback_data(), CatalogMode::Fallback)
    }

    /// Load option definitions from a YAML file and build a catalog from
    /// them. Used for custom catalogs when neither the graph store nor the
    /// bundled table fits.
    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read catalog file {:?}", path.as_ref()))?;
        let options: Vec<NmapOption> =
            serde_yaml::from_str(&content).context("failed to parse catalog YAML")?;
        Ok(Self::from_data(
            CatalogData {
                options,
                services: vec![],
            },
            CatalogMode::Fallback,
        ))
    }

    /// Look up an option by its flag token
    pub fn get(&self, name: &str) -> Option<&NmapOption> {
        self.options.get(name)
    }

    /// Whether the flag is a documented option
    pub fn is_known(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Whether two options are mutually exclusive
    pub fn conflict_between(&self, a: &str, b: &str) -> bool {
        self.conflicts
            .get(a)
            .map(|set| set.contains(b))
            .unwrap_or(false)
    }

    /// All flags that conflict with the given one, sorted
    pub fn conflicts_of(&self, name: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .conflicts
            .get(name)
            .map(|set| set.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Flags required by the given one (at least one must be present), sorted
    pub fn requires_of(&self, name: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .requires
            .get(name)
            .map(|set| set.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// All documented flags that need elevated privileges, sorted
    pub fn options_requiring_root(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .options
            .values()
            .filter(|o| o.requires_root)
            .map(|o| o.name.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    /// All documented options, sorted by flag name
    pub fn options(&self) -> Vec<&NmapOption> {
        let mut out: Vec<&NmapOption> = self.options.values().collect();
        out.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Auxiliary service entries
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Look up a service by name
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    /// Number of documented options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Canonical ordering for a pair of flags, used so conflict messages are
/// reproducible regardless of token order in the input.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The nine TCP/UDP scan type flags, mutually exclusive with one another
pub const SCAN_TYPE_FLAGS: [&str; 9] = [
    "-sA", "-sF", "-sM", "-sN", "-sS", "-sT", "-sU", "-sW", "-sX",
];

const TIMING_FLAGS: [&str; 6] = ["-T0", "-T1", "-T2", "-T3", "-T4", "-T5"];

fn opt(
    name: &str,
    category: OptionCategory,
    description: &str,
    requires_root: bool,
    requires_arg: bool,
    conflicts_with: &[&str],
    requires: &[&str],
    example: &str,
) -> NmapOption {
    NmapOption {
        name: name.to_string(),
        category,
        description: description.to_string(),
        requires_root,
        requires_arg,
        conflicts_with: conflicts_with.iter().map(|s| s.to_string()).collect(),
        requires: requires.iter().map(|s| s.to_string()).collect(),
        example: Some(example.to_string()),
    }
}

/// Bundled static option table used when the graph store is unreachable
pub fn fallback_data() -> CatalogData {
    use OptionCategory::*;

    let scan_type_descriptions = [
        ("-sA", "TCP ACK scan", true),
        ("-sF", "TCP FIN scan", true),
        ("-sM", "TCP Maimon scan", true),
        ("-sN", "TCP NULL scan", true),
        ("-sS", "TCP SYN scan (stealth scan)", true),
        ("-sT", "TCP connect scan", false),
        ("-sU", "UDP scan", true),
        ("-sW", "TCP Window scan", true),
        ("-sX", "TCP Xmas scan", true),
    ];

    let mut options = Vec::new();

    // Scan types: each conflicts with every other scan type and with -sn
    for (name, description, root) in scan_type_descriptions {
        let conflicts: Vec<&str> = SCAN_TYPE_FLAGS
            .iter()
            .copied()
            .filter(|f| *f != name)
            .chain(std::iter::once("-sn"))
            .collect();
        options.push(opt(
            name,
            ScanType,
            description,
            root,
            false,
            &conflicts,
            &[],
            &format!("nmap {} 192.168.1.1", name),
        ));
    }

    // Timing templates: mutually exclusive
    let timing_descriptions = [
        "Paranoid timing",
        "Sneaky timing",
        "Polite timing",
        "Normal timing",
        "Aggressive timing",
        "Insane timing",
    ];
    for (i, name) in TIMING_FLAGS.iter().enumerate() {
        let conflicts: Vec<&str> = TIMING_FLAGS
            .iter()
            .copied()
            .filter(|f| f != name)
            .collect();
        options.push(opt(
            name,
            Timing,
            timing_descriptions[i],
            false,
            false,
            &conflicts,
            &[],
            &format!("nmap {} 192.168.1.1", name),
        ));
    }

    // Port specification
    options.push(opt(
        "-p",
        PortSpec,
        "Port specification",
        false,
        true,
        &["-F", "-sn"],
        &[],
        "nmap -p 80,443 192.168.1.1",
    ));
    options.push(opt(
        "-p-",
        PortSpec,
        "Scan all 65535 ports",
        false,
        false,
        &["-F", "--top-ports"],
        &[],
        "nmap -p- 192.168.1.1",
    ));
    options.push(opt(
        "-F",
        PortSpec,
        "Fast scan (100 most common ports)",
        false,
        false,
        &["-p", "-p-"],
        &[],
        "nmap -F 192.168.1.1",
    ));
    options.push(opt(
        "--top-ports",
        PortSpec,
        "Scan the N most common ports",
        false,
        true,
        &["-p-"],
        &[],
        "nmap --top-ports 10 192.168.1.1",
    ));
    options.push(opt(
        "--exclude-ports",
        PortSpec,
        "Exclude ports from the scan",
        false,
        true,
        &[],
        &[],
        "nmap --exclude-ports 22 192.168.1.1",
    ));

    // Service and OS detection
    options.push(opt(
        "-sV",
        ServiceDetection,
        "Service/version detection",
        false,
        false,
        &[],
        &[],
        "nmap -sV 192.168.1.1",
    ));
    options.push(opt(
        "--version-intensity",
        ServiceDetection,
        "Version detection intensity (0-9)",
        false,
        true,
        &[],
        &["-sV"],
        "nmap -sV --version-intensity 5 192.168.1.1",
    ));
    options.push(opt(
        "-O",
        OsDetection,
        "OS detection",
        true,
        false,
        &[],
        &[],
        "nmap -O 192.168.1.1",
    ));
    options.push(opt(
        "-A",
        Misc,
        "Aggressive scan (OS detection, version detection, scripts, traceroute)",
        true,
        false,
        &[],
        &[],
        "nmap -A 192.168.1.1",
    ));

    // Host discovery
    options.push(opt(
        "-sn",
        Discovery,
        "Ping scan, skip port scan",
        false,
        false,
        &["-p", "-Pn"],
        &[],
        "nmap -sn 192.168.1.0/24",
    ));
    options.push(opt(
        "-Pn",
        Discovery,
        "Skip host discovery (treat all hosts as online)",
        false,
        false,
        &["-PS", "-PA", "-PU", "-PE", "-PP", "-PM"],
        &[],
        "nmap -Pn 192.168.1.1",
    ));
    let probes = [
        ("-PS", "TCP SYN discovery probe"),
        ("-PA", "TCP ACK discovery probe"),
        ("-PU", "UDP discovery probe"),
        ("-PE", "ICMP echo discovery probe"),
        ("-PP", "ICMP timestamp discovery probe"),
        ("-PM", "ICMP netmask discovery probe"),
    ];
    for (name, description) in probes {
        options.push(opt(
            name,
            Discovery,
            description,
            false,
            false,
            &[],
            &[],
            &format!("nmap {} 192.168.1.1", name),
        ));
    }

    // DNS
    options.push(opt(
        "-n",
        Dns,
        "Never do DNS resolution",
        false,
        false,
        &["-R"],
        &[],
        "nmap -n 192.168.1.1",
    ));
    options.push(opt(
        "-R",
        Dns,
        "Always resolve DNS",
        false,
        false,
        &[],
        &[],
        "nmap -R 192.168.1.1",
    ));

    // Scripting
    options.push(opt(
        "--script",
        Scripting,
        "Run NSE scripts",
        false,
        true,
        &[],
        &[],
        "nmap --script vuln 192.168.1.1",
    ));
    options.push(opt(
        "--script-args",
        Scripting,
        "Arguments for NSE scripts",
        false,
        true,
        &[],
        &["--script"],
        "nmap --script http-title --script-args http.useragent=test 192.168.1.1",
    ));

    // Output
    for (name, description) in [
        ("-oN", "Normal output to file"),
        ("-oX", "XML output to file"),
        ("-oG", "Grepable output to file"),
        ("-oA", "Output in all formats"),
    ] {
        options.push(opt(
            name,
            Output,
            description,
            false,
            true,
            &[],
            &[],
            &format!("nmap {} scan 192.168.1.1", name),
        ));
    }
    options.push(opt(
        "-v",
        Output,
        "Verbose output",
        false,
        false,
        &[],
        &[],
        "nmap -v 192.168.1.1",
    ));

    // Misc
    options.push(opt(
        "-6",
        Misc,
        "IPv6 scanning",
        false,
        false,
        &[],
        &[],
        "nmap -6 ::1",
    ));
    options.push(opt(
        "--traceroute",
        Misc,
        "Trace path to host",
        true,
        false,
        &[],
        &[],
        "nmap --traceroute 192.168.1.1",
    ));
    options.push(opt(
        "--reason",
        Misc,
        "Show reason a port is in a particular state",
        false,
        false,
        &[],
        &[],
        "nmap --reason 192.168.1.1",
    ));
    options.push(opt(
        "--open",
        Misc,
        "Only show open ports",
        false,
        false,
        &[],
        &[],
        "nmap --open 192.168.1.1",
    ));
    options.push(opt(
        "-iL",
        Misc,
        "Read targets from file",
        false,
        true,
        &[],
        &[],
        "nmap -iL targets.txt",
    ));
    options.push(opt(
        "-iR",
        Misc,
        "Scan random targets",
        false,
        true,
        &[],
        &[],
        "nmap -iR 10",
    ));

    let services = vec![
        Service {
            name: "http".into(),
            port: 80,
            protocol: "tcp".into(),
            description: "Hypertext Transfer Protocol".into(),
        },
        Service {
            name: "https".into(),
            port: 443,
            protocol: "tcp".into(),
            description: "HTTP over TLS".into(),
        },
        Service {
            name: "ssh".into(),
            port: 22,
            protocol: "tcp".into(),
            description: "Secure Shell".into(),
        },
        Service {
            name: "dns".into(),
            port: 53,
            protocol: "udp".into(),
            description: "Domain Name System".into(),
        },
        Service {
            name: "mysql".into(),
            port: 3306,
            protocol: "tcp".into(),
            description: "MySQL database".into(),
        },
        Service {
            name: "postgresql".into(),
            port: 5432,
            protocol: "tcp".into(),
            description: "PostgreSQL database".into(),
        },
    ];

    CatalogData { options, services }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fallback_catalog_loads() {
        let catalog = OptionCatalog::fallback();
        assert!(catalog.len() > 30);
        assert_eq!(catalog.mode(), CatalogMode::Fallback);
        assert!(catalog.is_known("-sS"));
        assert!(catalog.is_known("--script-args"));
        assert!(!catalog.is_known("--made-up"));
    }

    #[test]
    fn test_conflicts_are_symmetric() {
        let catalog = OptionCatalog::fallback();
        for name in ["-sS", "-sT", "-sn", "-p", "-F", "-T0", "-Pn"] {
            for other in catalog.conflicts_of(name) {
                assert!(
                    catalog.conflict_between(other, name),
                    "conflict {} -> {} missing its mirror",
                    name,
                    other
                );
            }
        }
    }

    #[test]
    fn test_symmetry_closure_from_one_sided_edges() {
        let data = CatalogData {
            options: vec![
                opt("-a", OptionCategory::Misc, "a", false, false, &["-b"], &[], "x"),
                opt("-b", OptionCategory::Misc, "b", false, false, &[], &[], "x"),
            ],
            services: vec![],
        };
        let catalog = OptionCatalog::from_data(data, CatalogMode::Graph);
        assert!(catalog.conflict_between("-a", "-b"));
        assert!(catalog.conflict_between("-b", "-a"));
    }

    #[test]
    fn test_scan_types_mutually_exclusive() {
        let catalog = OptionCatalog::fallback();
        for a in SCAN_TYPE_FLAGS {
            for b in SCAN_TYPE_FLAGS {
                if a != b {
                    assert!(catalog.conflict_between(a, b), "{} vs {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_requires_edges() {
        let catalog = OptionCatalog::fallback();
        assert_eq!(catalog.requires_of("--script-args"), vec!["--script"]);
        assert_eq!(catalog.requires_of("--version-intensity"), vec!["-sV"]);
        assert!(catalog.requires_of("-sS").is_empty());
    }

    #[test]
    fn test_root_required_options() {
        let catalog = OptionCatalog::fallback();
        let root = catalog.options_requiring_root();
        assert!(root.contains(&"-sS"));
        assert!(root.contains(&"-O"));
        assert!(!root.contains(&"-sT"));
    }

    #[test]
    fn test_canonical_pair_ordering() {
        assert_eq!(canonical_pair("-sT", "-sS"), ("-sS", "-sT"));
        assert_eq!(canonical_pair("-sS", "-sT"), ("-sS", "-sT"));
    }

    #[test]
    fn test_services_lookup() {
        let catalog = OptionCatalog::fallback();
        let http = catalog.service("http").expect("http service");
        assert_eq!(http.port, 80);
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- name: \"-sS\"\n  category: SCAN_TYPE\n  description: SYN scan\n  requires_root: true\n  requires_arg: false\n  conflicts_with: [\"-sT\"]\n- name: \"-sT\"\n  category: SCAN_TYPE\n  description: Connect scan\n  requires_root: false\n  requires_arg: false"
        )
        .unwrap();

        let catalog = OptionCatalog::load_from_yaml(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.conflict_between("-sT", "-sS"));
    }
}
