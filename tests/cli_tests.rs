//! CLI integration tests, run offline against the bundled catalog

use assert_cmd::Command;

fn nmap_cli() -> Command {
    Command::cargo_bin("nmap_cli").expect("binary builds")
}

#[test]
fn validate_accepts_a_clean_command() {
    nmap_cli()
        .args(["--offline", "validate", "nmap -sT 192.168.1.1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Command is valid and safe"));
}

#[test]
fn validate_rejects_a_conflict_with_exit_one() {
    nmap_cli()
        .args(["--offline", "validate", "nmap -sS -sT 192.168.1.1"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicates::str::contains("-sS conflicts with -sT"));
}

#[test]
fn validate_emits_parseable_json() {
    let output = nmap_cli()
        .args(["--offline", "validate", "--json", "nmap -sV 192.168.1.1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(report["valid"], true);
    assert!(report["score"].as_f64().unwrap() > 0.9);
    assert!(report["details"]["syntax"]["valid"].as_bool().unwrap());
}

#[test]
fn generate_produces_a_valid_command() {
    let output = nmap_cli()
        .args([
            "--offline",
            "generate",
            "--intent",
            "scan web server 10.0.0.9",
            "--complexity",
            "EASY",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let outcome: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(outcome["validation"]["valid"], true);
    let command = outcome["command"].as_str().unwrap();
    assert!(command.starts_with("nmap"));
    assert!(command.contains("10.0.0.9"));
}

#[test]
fn catalog_lists_known_options() {
    nmap_cli()
        .args(["--offline", "catalog"])
        .assert()
        .success()
        .stdout(predicates::str::contains("-sS"))
        .stdout(predicates::str::contains("Fallback"));
}

#[test]
fn unsafe_command_fails_validation() {
    nmap_cli()
        .args(["--offline", "validate", "nmap 192.168.1.1 > loot.txt"])
        .assert()
        .failure()
        .stdout(predicates::str::contains("not allowed"));
}
