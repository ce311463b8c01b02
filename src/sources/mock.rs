//! Mock provider for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Attribute, Attributes};
use crate::sources::{Provider, ProviderCapabilities, SourceError};
use crate::utils::titles_match;

/// Shared, ordered log of lookups, entries formatted `"<id>:<doi|title>:<value>"`
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A mock provider that returns predefined attributes and records every lookup.
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    capabilities: ProviderCapabilities,
    by_doi: HashMap<String, Attributes>,
    by_title: HashMap<String, Attributes>,
    failing: bool,
    log: CallLog,
}

impl MockProvider {
    /// Create a mock provider that finds nothing.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            capabilities: ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::TITLE_LOOKUP,
            by_doi: HashMap::new(),
            by_title: HashMap::new(),
            failing: false,
            log: CallLog::default(),
        }
    }

    /// Answer a DOI lookup with the given attributes.
    pub fn with_doi_response<const N: usize>(
        mut self,
        doi: &str,
        attributes: [(Attribute, &str); N],
    ) -> Self {
        self.by_doi.insert(doi.to_string(), to_attributes(attributes));
        self
    }

    /// Answer a title lookup with the given attributes.
    pub fn with_title_response<const N: usize>(
        mut self,
        title: &str,
        attributes: [(Attribute, &str); N],
    ) -> Self {
        self.by_title.insert(title.to_string(), to_attributes(attributes));
        self
    }

    /// Fail every lookup with a network error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Restrict the supported lookups.
    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Record lookups into a log shared with other providers.
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Lookups made so far (across every provider sharing the log).
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, kind: &str, value: &str) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{}:{}:{}", self.id, kind, value));
    }
}

fn to_attributes<const N: usize>(attributes: [(Attribute, &str); N]) -> Attributes {
    attributes
        .into_iter()
        .map(|(attribute, value)| (attribute, value.to_string()))
        .collect()
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Option<Attributes>, SourceError> {
        self.record("doi", doi);
        if self.failing {
            return Err(SourceError::Network("connection refused".to_string()));
        }
        Ok(self.by_doi.get(doi).cloned())
    }

    async fn lookup_title(&self, title: &str) -> Result<Option<Attributes>, SourceError> {
        self.record("title", title);
        if self.failing {
            return Err(SourceError::Network("connection refused".to_string()));
        }
        Ok(self
            .by_title
            .iter()
            .find(|(candidate, _)| titles_match(candidate, title))
            .map(|(_, attributes)| attributes.clone()))
    }
}
