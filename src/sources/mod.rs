//! Metadata providers with a uniform lookup contract.
//!
//! Every provider implements [`Provider`]: two raw lookups (by DOI and by
//! title) that may fail, and the provided [`Provider::query`] that wraps them
//! into the contract the aggregator relies on:
//!
//! - a non-empty DOI is looked up by DOI, otherwise a title by title
//! - titles with fewer than [`MIN_TITLE_TERMS`] terms are skipped without any
//!   remote call
//! - failures of any kind are logged and reported as "no match"
//! - a mapping whose values are all empty is "no match"
//!
//! # Providers
//!
//! - `crossref` - Crossref REST API
//! - `semantic` - Semantic Scholar Graph API (rate limited, 3 s between calls)
//! - `oai` - internal repository over OAI-PMH (only when an endpoint is configured)
//!
//! # Runtime Configuration
//!
//! The provider order and per-provider delays come from [`crate::config::Config`]:
//!
//! ```toml
//! [providers]
//! order = ["crossref", "semantic", "oai"]
//! oai_endpoint = "https://oai.example.org/oai"
//!
//! [[provider_delays]]
//! provider = "semantic"
//! delay_ms = 3000
//! ```

mod crossref;
mod oai;
mod rate_limit;
mod registry;
mod semantic;

pub mod mock;

pub use crossref::CrossrefSource;
pub use mock::MockProvider;
pub use oai::{OaiSource, DEFAULT_METADATA_PREFIX};
pub use rate_limit::{RateLimited, SEMANTIC_SCHOLAR_DELAY};
pub use registry::{ProviderCapabilities, ProviderRegistry};
pub use semantic::SemanticScholarSource;

use async_trait::async_trait;

use crate::models::{Attributes, ProviderResponse};
use crate::utils::title_term_count;

/// Titles with fewer terms cannot be matched reliably and are never looked up
pub const MIN_TITLE_TERMS: usize = 3;

/// The key a single provider call is made with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Doi(&'a str),
    Title(&'a str),
}

impl LookupKey<'_> {
    /// The raw lookup value
    pub fn value(&self) -> &str {
        match self {
            LookupKey::Doi(v) | LookupKey::Title(v) => v,
        }
    }

    /// Name of the key, as used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            LookupKey::Doi(_) => "doi",
            LookupKey::Title(_) => "title",
        }
    }
}

/// The Provider trait defines the interface for all metadata providers.
///
/// # Implementing a New Provider
///
/// 1. Create a struct that implements `Provider`
/// 2. Implement `id`, `name` and the lookups it supports
/// 3. Declare the supported lookups in `capabilities`
/// 4. Add it to `ProviderRegistry::from_config` or register it dynamically
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Unique identifier, recorded as provenance of merged attributes
    fn id(&self) -> &str;

    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// Lookups this provider supports
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::TITLE_LOOKUP
    }

    /// Look a paper up by DOI
    async fn lookup_doi(&self, _doi: &str) -> Result<Option<Attributes>, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Look a paper up by title; implementations must only accept candidates
    /// whose title equals `title` case-insensitively
    async fn lookup_title(&self, _title: &str) -> Result<Option<Attributes>, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Query this provider with a single key, never failing
    async fn query(&self, key: LookupKey<'_>) -> ProviderResponse {
        let value = key.value().trim();
        if value.is_empty() {
            return ProviderResponse::no_match(self.id());
        }

        let result = match key {
            LookupKey::Doi(_) => {
                if !self.capabilities().contains(ProviderCapabilities::DOI_LOOKUP) {
                    return ProviderResponse::no_match(self.id());
                }
                tracing::debug!("{}: querying for doi \"{}\"", self.id(), value);
                self.lookup_doi(value).await
            }
            LookupKey::Title(_) => {
                if !self.capabilities().contains(ProviderCapabilities::TITLE_LOOKUP) {
                    return ProviderResponse::no_match(self.id());
                }
                if title_term_count(value) < MIN_TITLE_TERMS {
                    tracing::debug!("{}: skipping short title \"{}\"", self.id(), value);
                    return ProviderResponse::no_match(self.id());
                }
                tracing::debug!("{}: querying for title \"{}\"", self.id(), value);
                self.lookup_title(value).await
            }
        };

        match result {
            Ok(attributes) => ProviderResponse::new(self.id(), attributes),
            Err(e) => {
                tracing::error!(
                    "{}: querying by {} \"{}\" failed: {}",
                    self.id(),
                    key.kind(),
                    value,
                    e
                );
                ProviderResponse::no_match(self.id())
            }
        }
    }
}

/// Errors that can occur when talking to a provider or the catalog
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested lookup is not implemented for this provider
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error from the remote service
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
