//! Pipeline configuration
//!
//! One explicit configuration struct injected at engine construction; no
//! ambient singletons. Values load from environment variables with
//! defaults, or from a file with environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl EngineConfig {
    /// Load configuration from `INSIGHTS__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env("INSIGHTS")
    }

    /// Load configuration from environment with a custom prefix.
    pub fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("provider.endpoint", "http://localhost:8080/v1/chat/completions")?
            .set_default("provider.api_key", "")?
            .set_default("provider.model", "gpt-4o-mini")?
            .set_default("provider.request_timeout_secs", 15)?
            .set_default("provider.max_retries", 2)?
            .set_default("limits.max_concurrency", 12)?
            .set_default("limits.unit_timeout_secs", 10)?
            .set_default("limits.max_body_len", 4000)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load configuration from file with environment overrides.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("INSIGHTS").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            limits: LimitsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Enrichment provider connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Chat-completions style endpoint URL.
    pub endpoint: String,
    pub api_key: String,
    /// Model or deployment name sent with every request.
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Throughput and truncation limits for Stage 1.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Ceiling on simultaneously in-flight enrichment calls; the
    /// effective limit is the smaller of this and the document count.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-document deadline, distinct from the provider's own timeout.
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
    /// Document bodies longer than this are truncated before dispatch.
    #[serde(default = "default_max_body_len")]
    pub max_body_len: usize,
}

impl LimitsConfig {
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            unit_timeout_secs: default_unit_timeout_secs(),
            max_body_len: default_max_body_len(),
        }
    }
}

/// Extraction output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-sheet markdown files; `None` disables persistence.
    #[serde(default)]
    pub markdown_dir: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> usize {
    2
}

fn default_max_concurrency() -> usize {
    12
}

fn default_unit_timeout_secs() -> u64 {
    10
}

fn default_max_body_len() -> usize {
    4000
}
