//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables prefixed with `PAPER_HARVEST` (nested keys use
//! `__`, e.g. `PAPER_HARVEST_STORAGE__CHUNK_SIZE=50`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [catalog]
//! endpoint = "https://triplestore.example.org/sparql"
//!
//! [storage]
//! data_dir = "./data"
//! dump_file = "orkg_papers.csv"
//! changelog_file = "changelog.txt"
//! chunk_size = 25
//!
//! [providers]
//! order = ["crossref", "semantic", "oai"]
//! crossref_mailto = "team@example.org"
//! oai_endpoint = "https://oai.example.org/oai"
//! oai_metadata_prefix = "ftx"
//!
//! [api_keys]
//! semantic_scholar = "your-api-key"
//!
//! [[provider_delays]]
//! provider = "semantic"
//! delay_ms = 3000
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::{DEFAULT_METADATA_PREFIX, SEMANTIC_SCHOLAR_DELAY};

/// Identifiers of the providers that can appear in `providers.order`
pub const KNOWN_PROVIDERS: [&str; 3] = ["crossref", "semantic", "oai"];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog (SPARQL endpoint) settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Dump and changelog locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Provider order and endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Fixed delays paid before every call to a provider
    #[serde(default = "default_provider_delays")]
    pub provider_delays: Vec<ProviderDelay>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            storage: StorageConfig::default(),
            providers: ProvidersConfig::default(),
            api_keys: ApiKeys::default(),
            provider_delays: default_provider_delays(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Check values that deserialization alone cannot enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "storage.chunk_size must be greater than zero".to_string(),
            ));
        }

        for id in self
            .providers
            .order
            .iter()
            .chain(self.provider_delays.iter().map(|d| &d.provider))
        {
            if !KNOWN_PROVIDERS.contains(&id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "unknown provider '{}' (expected one of: {})",
                    id,
                    KNOWN_PROVIDERS.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Delay configured for a provider, if any
    pub fn delay_for(&self, provider: &str) -> Option<Duration> {
        self.provider_delays
            .iter()
            .find(|d| d.provider == provider)
            .map(|d| Duration::from_millis(d.delay_ms))
    }

    /// Full path of the papers dump
    pub fn dump_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.dump_file)
    }

    /// Full path of the changelog
    pub fn changelog_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.changelog_file)
    }

    /// Render this configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SPARQL endpoint of the triple store
    #[serde(default)]
    pub endpoint: Option<String>,

    /// SELECT statement override; must project uri, title and doi in that order
    #[serde(default)]
    pub query: Option<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the dump and the changelog
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File name of the papers dump
    #[serde(default = "default_dump_file")]
    pub dump_file: String,

    /// File name of the changelog
    #[serde(default = "default_changelog_file")]
    pub changelog_file: String,

    /// Papers enriched between two flushes of the dump
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            dump_file: default_dump_file(),
            changelog_file: default_changelog_file(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_dump_file() -> String {
    "orkg_papers.csv".to_string()
}

fn default_changelog_file() -> String {
    "changelog.txt".to_string()
}

fn default_chunk_size() -> usize {
    25
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Priority order in which providers are queried
    #[serde(default = "default_provider_order")]
    pub order: Vec<String>,

    /// Contact address sent to Crossref
    #[serde(default)]
    pub crossref_mailto: Option<String>,

    /// OAI-PMH endpoint of the internal repository; `oai` is skipped without it
    #[serde(default)]
    pub oai_endpoint: Option<String>,

    /// OAI-PMH metadata format
    #[serde(default = "default_oai_metadata_prefix")]
    pub oai_metadata_prefix: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_provider_order(),
            crossref_mailto: None,
            oai_endpoint: None,
            oai_metadata_prefix: default_oai_metadata_prefix(),
        }
    }
}

fn default_provider_order() -> Vec<String> {
    KNOWN_PROVIDERS.iter().map(|s| s.to_string()).collect()
}

fn default_oai_metadata_prefix() -> String {
    DEFAULT_METADATA_PREFIX.to_string()
}

/// API keys for external services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default)]
    pub semantic_scholar: Option<String>,
}

/// Fixed delay before every call to one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDelay {
    pub provider: String,
    pub delay_ms: u64,
}

fn default_provider_delays() -> Vec<ProviderDelay> {
    vec![ProviderDelay {
        provider: "semantic".to_string(),
        delay_ms: SEMANTIC_SCHOLAR_DELAY.as_millis() as u64,
    }]
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for structured output, plain text otherwise
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Load configuration from an optional file, layered under environment variables
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("PAPER_HARVEST")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Find a configuration file in the default locations
///
/// Looks for `./paper-harvest.toml`, then `<config dir>/paper-harvest/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("paper-harvest.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paper-harvest").join("config.toml"))
        .filter(|path| path.is_file())
}
