//! Self-correction loop tests through the public API

use std::sync::Arc;
use std::sync::Mutex;

use nmap_core::{
    CancelToken, CommandGenerator, CommandValidator, Complexity, CorrectionError,
    GenerationError, KeywordGenerator, OptionCatalog, SelfCorrector,
};

/// Scripted generator: returns its candidates in order, repeating the last
struct Playback {
    candidates: Vec<&'static str>,
    intents: Mutex<Vec<String>>,
}

impl Playback {
    fn new(candidates: &[&'static str]) -> Self {
        Self {
            candidates: candidates.to_vec(),
            intents: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.intents.lock().unwrap().len()
    }
}

impl CommandGenerator for Playback {
    fn generate(&self, intent: &str, _: Complexity) -> Result<String, GenerationError> {
        let mut intents = self.intents.lock().unwrap();
        let index = intents.len().min(self.candidates.len() - 1);
        intents.push(intent.to_string());
        Ok(self.candidates[index].to_string())
    }
}

fn validator() -> CommandValidator {
    CommandValidator::new(Arc::new(OptionCatalog::fallback()))
}

#[test]
fn accepts_first_valid_candidate() {
    let generator = Playback::new(&["nmap -sT 192.168.1.1"]);
    let outcome = SelfCorrector::default()
        .run("scan a host", Complexity::Easy, &generator, &validator())
        .unwrap();

    assert!(outcome.validation.valid);
    assert_eq!(outcome.metadata.attempts, 0);
    assert!(!outcome.metadata.corrected);
    assert_eq!(generator.calls(), 1);
}

#[test]
fn recovers_from_a_conflicting_candidate() {
    let generator = Playback::new(&["nmap -sS -sT 192.168.1.1", "nmap -sT 192.168.1.1"]);
    let outcome = SelfCorrector::default()
        .run("scan a host", Complexity::Medium, &generator, &validator())
        .unwrap();

    assert!(outcome.validation.valid);
    assert_eq!(outcome.command, "nmap -sT 192.168.1.1");
    assert_eq!(outcome.metadata.attempts, 1);
    assert!(outcome.metadata.corrected);
    assert_eq!(outcome.history.len(), 2);
    assert!(!outcome.history[0].validation.valid);
    assert!(outcome.history[1].validation.valid);
}

#[test]
fn error_messages_flow_back_as_hints() {
    let generator = Playback::new(&["nmap 192.168.1.1 > out.txt", "nmap -sT 192.168.1.1"]);
    SelfCorrector::default()
        .run("scan a host", Complexity::Medium, &generator, &validator())
        .unwrap();

    let intents = generator.intents.lock().unwrap();
    assert_eq!(intents[0], "scan a host");
    assert!(intents[1].contains("Output redirection"), "{}", intents[1]);
}

#[test]
fn retry_budget_bounds_generation_calls() {
    let generator = Playback::new(&["nmap -sS -sT 192.168.1.1"]);
    let outcome = SelfCorrector::new(2)
        .run("scan a host", Complexity::Medium, &generator, &validator())
        .unwrap();

    assert!(!outcome.validation.valid);
    assert_eq!(outcome.metadata.attempts, 2);
    assert_eq!(generator.calls(), 3);
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.confidence < 0.5);
}

#[test]
fn zero_retries_means_single_shot() {
    let generator = Playback::new(&["nmap -sS -sT 192.168.1.1"]);
    let outcome = SelfCorrector::new(0)
        .run("scan a host", Complexity::Medium, &generator, &validator())
        .unwrap();

    assert!(!outcome.validation.valid);
    assert_eq!(generator.calls(), 1);
}

#[test]
fn cancellation_stops_before_generation() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let generator = Playback::new(&["nmap -sT 192.168.1.1"]);

    let result = SelfCorrector::default().run_with_cancel(
        "scan a host",
        Complexity::Easy,
        &generator,
        &validator(),
        &cancel,
    );

    assert!(matches!(result, Err(CorrectionError::Cancelled)));
    assert_eq!(generator.calls(), 0);
}

#[test]
fn keyword_generator_round_trip() {
    let catalog = Arc::new(OptionCatalog::fallback());
    let generator = KeywordGenerator::new(catalog.clone());
    let validator = CommandValidator::new(catalog);

    for (intent, complexity) in [
        ("scan the web server at 10.1.2.3", Complexity::Medium),
        ("find hosts that are alive on 192.168.0.0/24", Complexity::Easy),
        ("check for ssh access", Complexity::Easy),
    ] {
        let outcome = SelfCorrector::default()
            .run(intent, complexity, &generator, &validator)
            .unwrap();
        assert!(outcome.validation.valid, "{}: {}", intent, outcome.command);
        assert_eq!(outcome.metadata.attempts, 0, "{}", intent);
    }
}

#[test]
fn outcome_serializes_for_downstream_consumers() {
    let generator = Playback::new(&["nmap -sT 192.168.1.1"]);
    let outcome = SelfCorrector::default()
        .run("scan a host", Complexity::Easy, &generator, &validator())
        .unwrap();

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["metadata"]["complexity"], "EASY");
    assert_eq!(value["metadata"]["attempts"], 0);
    assert!(value["history"].as_array().unwrap().len() == 1);
}
