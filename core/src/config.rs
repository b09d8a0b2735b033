//! Configuration loading
//!
//! Loads configuration from `--config`, else `ONTOMAP_CONFIG`, else
//! `~/.config/ontomap/ontomap.toml`. A missing file yields defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{OntomapError, Result};
use crate::output::OutputFormat;

/// Root configuration for an enrichment run
#[derive(Debug, Deserialize, Clone)]
pub struct OntomapConfig {
    /// Master switch for classifier enrichment
    #[serde(default = "default_enrich")]
    pub enrich: bool,

    /// Path of the persisted mapping store
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Path of the output record collection
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Output collection format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Classifier service settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Spreadsheet API settings
    #[serde(default)]
    pub sheets: SheetsConfig,
}

fn default_enrich() -> bool {
    true
}

fn default_store_path() -> String {
    "data/ontology_cache.json".to_string()
}

fn default_output_path() -> String {
    "data/sheets/output.json".to_string()
}

/// Classifier service configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Endpoint receiving classification requests
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Fixed pause after each call in milliseconds (0 = none)
    #[serde(default)]
    pub delay_ms: u64,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8080/v1/classify".to_string()
}
fn default_model() -> String {
    "ontology-mapper".to_string()
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_api_key_env() -> String {
    "ONTOMAP_CLASSIFIER_API_KEY".to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            delay_ms: 0,
            api_key_env: default_api_key_env(),
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Spreadsheet API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    /// API base URL
    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_sheets_token_env")]
    pub token_env: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}
fn default_sheets_token_env() -> String {
    "ONTOMAP_SHEETS_TOKEN".to_string()
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: default_sheets_api_base(),
            token_env: default_sheets_token_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for OntomapConfig {
    fn default() -> Self {
        Self {
            enrich: default_enrich(),
            store_path: default_store_path(),
            output_path: default_output_path(),
            output_format: OutputFormat::default(),
            classifier: ClassifierConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub enrich: Option<bool>,
    pub store_path: Option<String>,
    pub output_path: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub classifier_endpoint: Option<String>,
    pub classifier_model: Option<String>,
    pub classifier_timeout_ms: Option<u64>,
    pub classifier_delay_ms: Option<u64>,
}

impl OntomapConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "ONTOMAP_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "ontomap.toml";

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the file is resolved from
    /// `ONTOMAP_CONFIG` or the home config directory, and a missing file
    /// returns defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let path = Self::resolve_config_path();
        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "Config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            OntomapError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: OntomapConfig = toml::from_str(contents)
            .map_err(|e| OntomapError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply command-line overrides and re-validate
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(enrich) = overrides.enrich {
            self.enrich = enrich;
        }
        if let Some(path) = overrides.store_path {
            self.store_path = path;
        }
        if let Some(path) = overrides.output_path {
            self.output_path = path;
        }
        if let Some(format) = overrides.output_format {
            self.output_format = format;
        }
        if let Some(endpoint) = overrides.classifier_endpoint {
            self.classifier.endpoint = endpoint;
        }
        if let Some(model) = overrides.classifier_model {
            self.classifier.model = model;
        }
        if let Some(timeout_ms) = overrides.classifier_timeout_ms {
            self.classifier.timeout_ms = timeout_ms;
        }
        if let Some(delay_ms) = overrides.classifier_delay_ms {
            self.classifier.delay_ms = delay_ms;
        }

        self.validate()?;
        Ok(self)
    }

    /// Resolve the configuration file path
    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("ontomap")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enrich && self.classifier.endpoint.trim().is_empty() {
            return Err(OntomapError::config(
                "classifier.endpoint is empty while enrichment is enabled",
            ));
        }

        if self.store_path.trim().is_empty() || self.output_path.trim().is_empty() {
            return Err(OntomapError::config("store_path and output_path must be set"));
        }

        if self.classifier.timeout_ms == 0 {
            tracing::warn!("classifier.timeout_ms is 0; requests will time out immediately");
        }

        if self.classifier.delay_ms > 60_000 {
            tracing::warn!(
                delay_ms = self.classifier.delay_ms,
                "classifier.delay_ms exceeds one minute per call"
            );
        }

        Ok(())
    }

    /// Store path with a leading `~/` expanded
    pub fn resolved_store_path(&self) -> PathBuf {
        expand_home(&self.store_path)
    }

    /// Output path with a leading `~/` expanded
    pub fn resolved_output_path(&self) -> PathBuf {
        expand_home(&self.output_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = OntomapConfig::default();
        assert!(cfg.enrich);
        assert_eq!(cfg.classifier.timeout_ms, 30_000);
        assert_eq!(cfg.classifier.delay(), Duration::ZERO);
        assert_eq!(cfg.classifier.api_key_env, "ONTOMAP_CLASSIFIER_API_KEY");
        assert_eq!(cfg.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            store_path = "/tmp/cache.json"
        "#;

        let cfg = OntomapConfig::parse(toml).expect("should parse");
        assert_eq!(cfg.store_path, "/tmp/cache.json");
        // Defaults should be applied
        assert_eq!(cfg.output_path, "data/sheets/output.json");
        assert_eq!(cfg.classifier.model, "ontology-mapper");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            enrich = false
            store_path = "~/ontomap/cache.json"
            output_path = "out/records.jsonl"
            output_format = "jsonl"

            [classifier]
            endpoint = "https://classifier.example/v1/map"
            model = "mapper-large"
            timeout_ms = 5000
            delay_ms = 250
            api_key_env = "MAPPER_KEY"

            [sheets]
            api_base = "http://localhost:9000"
            token_env = "SHEETS_TOKEN"
        "#;

        let cfg = OntomapConfig::parse(toml).expect("should parse");
        assert!(!cfg.enrich);
        assert_eq!(cfg.output_format, OutputFormat::Jsonl);
        assert_eq!(cfg.classifier.endpoint, "https://classifier.example/v1/map");
        assert_eq!(cfg.classifier.delay(), Duration::from_millis(250));
        assert_eq!(cfg.classifier.api_key_env, "MAPPER_KEY");
        assert_eq!(cfg.sheets.token_env, "SHEETS_TOKEN");
        assert_eq!(cfg.sheets.timeout_ms, 30_000);
    }

    #[test]
    fn test_empty_endpoint_rejected_when_enriching() {
        let err = OntomapConfig::parse("[classifier]\nendpoint = \"\"\n").expect_err("invalid");
        assert!(err.to_string().contains("classifier.endpoint"));

        let cfg = OntomapConfig::parse("enrich = false\n[classifier]\nendpoint = \"\"\n")
            .expect("enrichment disabled");
        assert!(!cfg.enrich);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cfg = OntomapConfig::default()
            .with_overrides(ConfigOverrides {
                enrich: Some(false),
                output_format: Some(OutputFormat::Jsonl),
                classifier_timeout_ms: Some(1000),
                ..Default::default()
            })
            .expect("valid");
        assert!(!cfg.enrich);
        assert_eq!(cfg.output_format, OutputFormat::Jsonl);
        assert_eq!(cfg.classifier.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = OntomapConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
