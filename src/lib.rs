//! nmap_core - Validation and self-correction engine for nmap commands
//!
//! Modules:
//! - catalog: Option knowledge base (conflicts, requirements, root flags)
//! - graph_store: Neo4j-backed catalog loading with bundled fallback
//! - syntax: Tokenization and token-level well-formedness checks
//! - conflict: Mutual-exclusion and requirement-edge detection
//! - safety: Shell-injection blacklist and advisory scan warnings
//! - privilege: Root-requirement detection and sudo awareness
//! - decision: Scoring, confidence, and execution recommendations
//! - validator: The staged validation pipeline
//! - generator: Command generation boundary plus a rule-based generator
//! - correction: Generate-validate-retry loop with correction hints

pub mod catalog;
pub mod graph_store;
pub mod syntax;
pub mod conflict;
pub mod safety;
pub mod privilege;
pub mod decision;
pub mod validator;
pub mod generator;
pub mod correction;

// Re-export key types for convenience
pub use catalog::{CatalogMode, NmapOption, OptionCatalog, OptionCategory, Service};

pub use graph_store::{load_or_fallback, GraphStore, GraphStoreConfig, StoreError};

pub use syntax::{ParsedCommand, SyntaxChecker};

pub use safety::{SafetyCategory, SafetyChecker, SafetyFinding, SafetyPattern};

pub use privilege::RootCheck;

pub use validator::{
    CommandValidator, RootPolicy, StageResult, ValidationDetails, ValidationPolicy,
    ValidationReport,
};

pub use generator::{CommandGenerator, Complexity, GenerationError, KeywordGenerator};

pub use correction::{
    CancelToken, CorrectionAttempt, CorrectionError, CorrectionMetadata, CorrectionOutcome,
    SelfCorrector,
};
