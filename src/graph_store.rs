//! Graph store client for nmap_core
//!
//! Loads the option catalog from a Neo4j instance over the HTTP
//! transactional API. The store is only consulted once, at catalog load;
//! any failure (timeout, connection refused, malformed response) downgrades
//! the whole process to the bundled fallback table. Store errors are never
//! surfaced to validation callers.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::catalog::{
    CatalogData, CatalogMode, NmapOption, OptionCatalog, OptionCategory, Service,
};

const DEFAULT_URI: &str = "http://localhost:7474";
const DEFAULT_USER: &str = "neo4j";
const DEFAULT_PASSWORD: &str = "password123";
const DEFAULT_DATABASE: &str = "neo4j";
const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Connection settings for the graph store
#[derive(Clone, Debug)]
pub struct GraphStoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub timeout: Duration,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl GraphStoreConfig {
    /// Read settings from NMAP_KG_* environment variables, with the same
    /// defaults the original deployment used.
    pub fn from_env() -> Self {
        let timeout_ms = std::env::var("NMAP_KG_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Self {
            uri: std::env::var("NMAP_KG_URI").unwrap_or_else(|_| DEFAULT_URI.to_string()),
            user: std::env::var("NMAP_KG_USER").unwrap_or_else(|_| DEFAULT_USER.to_string()),
            password: std::env::var("NMAP_KG_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_PASSWORD.to_string()),
            database: std::env::var("NMAP_KG_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Graph store failures. These only ever trigger fallback mode.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("graph store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("graph store returned errors: {0}")]
    Query(String),

    #[error("unexpected graph store response: {0}")]
    Malformed(String),
}

/// Blocking client for the Neo4j HTTP transactional API
pub struct GraphStore {
    config: GraphStoreConfig,
    client: reqwest::blocking::Client,
}

impl GraphStore {
    /// Connect to the store and probe it with a trivial query
    pub fn connect(config: GraphStoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let store = Self { config, client };
        store.run("RETURN 1")?;
        info!(uri = %store.config.uri, "connected to graph store");
        Ok(store)
    }

    /// Load the full option catalog: Option nodes with CONFLICTS_WITH and
    /// REQUIRES edges, plus auxiliary Service nodes.
    pub fn load_catalog(&self) -> Result<CatalogData, StoreError> {
        let option_rows = self.run(
            "MATCH (o:Option) \
             OPTIONAL MATCH (o)-[:CONFLICTS_WITH]->(c:Option) \
             OPTIONAL MATCH (o)-[:REQUIRES]->(r:Option) \
             RETURN o.name, o.category, o.description, o.requires_root, \
                    o.requires_args, o.example, \
                    collect(DISTINCT c.name), collect(DISTINCT r.name)",
        )?;
        let service_rows =
            self.run("MATCH (s:Service) RETURN s.name, s.port, s.protocol, s.description")?;

        let options = option_rows
            .iter()
            .map(|row| option_from_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        let services = service_rows
            .iter()
            .map(|row| service_from_row(row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CatalogData { options, services })
    }

    /// Run a single Cypher statement and return its result rows
    fn run(&self, statement: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.uri.trim_end_matches('/'),
            self.config.database
        );
        let body = json!({ "statements": [{ "statement": statement }] });

        let response: Value = self
            .client
            .post(&url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()?
            .json()?;

        extract_rows(&response)
    }
}

/// Pull result rows out of a transactional API response
fn extract_rows(response: &Value) -> Result<Vec<Vec<Value>>, StoreError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(StoreError::Query(errors[0].to_string()));
        }
    }

    let data = response
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(|result| result.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Malformed("missing results[0].data".into()))?;

    data.iter()
        .map(|entry| {
            entry
                .get("row")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| StoreError::Malformed("result entry without row".into()))
        })
        .collect()
}

fn option_from_row(row: &[Value]) -> Result<NmapOption, StoreError> {
    if row.len() < 8 {
        return Err(StoreError::Malformed(format!(
            "option row has {} columns, expected 8",
            row.len()
        )));
    }

    let name = row[0]
        .as_str()
        .ok_or_else(|| StoreError::Malformed("option without name".into()))?
        .to_string();
    let category = OptionCategory::from_label(row[1].as_str().unwrap_or(""));
    let description = row[2].as_str().unwrap_or("").to_string();
    let requires_root = row[3].as_bool().unwrap_or(false);
    let requires_arg = row[4].as_bool().unwrap_or(false);
    let example = row[5].as_str().map(|s| s.to_string());
    let conflicts_with = string_list(&row[6]);
    let requires = string_list(&row[7]);

    Ok(NmapOption {
        name,
        category,
        description,
        requires_root,
        requires_arg,
        conflicts_with,
        requires,
        example,
    })
}

fn service_from_row(row: &[Value]) -> Result<Service, StoreError> {
    if row.len() < 4 {
        return Err(StoreError::Malformed(format!(
            "service row has {} columns, expected 4",
            row.len()
        )));
    }

    Ok(Service {
        name: row[0]
            .as_str()
            .ok_or_else(|| StoreError::Malformed("service without name".into()))?
            .to_string(),
        port: row[1].as_u64().unwrap_or(0) as u16,
        protocol: row[2].as_str().unwrap_or("tcp").to_string(),
        description: row[3].as_str().unwrap_or("").to_string(),
    })
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// One-time catalog load: try the graph store if a config is given, fall
/// back to the bundled table otherwise (or on any store failure).
pub fn load_or_fallback(config: Option<GraphStoreConfig>) -> OptionCatalog {
    let Some(config) = config else {
        return OptionCatalog::fallback();
    };

    match GraphStore::connect(config).and_then(|store| store.load_catalog()) {
        Ok(data) if !data.options.is_empty() => {
            OptionCatalog::from_data(data, CatalogMode::Graph)
        }
        Ok(_) => {
            warn!("graph store returned an empty catalog, using fallback table");
            OptionCatalog::fallback().mark_degraded()
        }
        Err(e) => {
            warn!(error = %e, "graph store unavailable, using fallback table");
            OptionCatalog::fallback().mark_degraded()
        }
    }
}
