//! Registry holding the configured providers in priority order.

use std::sync::Arc;
use std::time::Duration;

use super::{
    CrossrefSource, OaiSource, Provider, RateLimited, SemanticScholarSource, SourceError,
};
use crate::config::Config;

bitflags::bitflags! {
    /// Lookups that a provider can answer
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProviderCapabilities: u32 {
        const DOI_LOOKUP = 1 << 0;
        const TITLE_LOOKUP = 1 << 1;
    }
}

/// Ordered registry of metadata providers
///
/// Order is significant: the aggregator asks providers in registration
/// order and the first non-empty value for an attribute wins.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the providers named in `providers.order`
    ///
    /// Providers with a configured delay are wrapped in [`RateLimited`].
    /// `oai` is skipped with a warning when no endpoint is configured.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let mut registry = Self::new();

        for id in &config.providers.order {
            let delay = config.delay_for(id);
            let provider = match id.as_str() {
                "crossref" => rate_limited(
                    CrossrefSource::new(config.providers.crossref_mailto.as_deref())?,
                    delay,
                ),
                "semantic" => rate_limited(
                    SemanticScholarSource::new(config.api_keys.semantic_scholar.clone())?,
                    delay,
                ),
                "oai" => match config.providers.oai_endpoint.as_deref() {
                    Some(endpoint) if !endpoint.trim().is_empty() => rate_limited(
                        OaiSource::new(endpoint, &config.providers.oai_metadata_prefix)?,
                        delay,
                    ),
                    _ => {
                        tracing::warn!("Skipping provider 'oai': no providers.oai_endpoint set");
                        continue;
                    }
                },
                other => {
                    return Err(SourceError::InvalidRequest(format!(
                        "Unknown provider '{}'",
                        other
                    )))
                }
            };

            registry.register(provider);
        }

        tracing::debug!("Registered providers: {:?}", registry.ids());
        Ok(registry)
    }

    /// Append a provider at the lowest priority
    ///
    /// A provider whose id is already registered replaces the earlier one in place.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        match self.providers.iter().position(|p| p.id() == provider.id()) {
            Some(index) => self.providers[index] = provider,
            None => self.providers.push(provider),
        }
    }

    /// Get a provider by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    /// Provider IDs in priority order
    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Hand the ordered providers over to an aggregator
    pub fn into_providers(self) -> Vec<Arc<dyn Provider>> {
        self.providers
    }
}

/// Wrap a provider in a fixed delay when one is configured
fn rate_limited<P: Provider + 'static>(provider: P, delay: Option<Duration>) -> Arc<dyn Provider> {
    match delay {
        Some(delay) if !delay.is_zero() => Arc::new(RateLimited::new(provider, delay)),
        _ => Arc::new(provider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderDelay;
    use crate::sources::MockProvider;

    #[test]
    fn test_default_config_order() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();

        // No OAI endpoint in the defaults
        assert_eq!(registry.ids(), vec!["crossref", "semantic"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_configured_order_is_kept() {
        let mut config = Config::default();
        config.providers.order = vec!["oai".into(), "semantic".into(), "crossref".into()];
        config.providers.oai_endpoint = Some("http://localhost:9/oai".into());

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.ids(), vec!["oai", "semantic", "crossref"]);
        assert_eq!(registry.get("oai").unwrap().name(), "Internal Repository (OAI-PMH)");
    }

    #[test]
    fn test_delays_only_wrap_configured_providers() {
        let mut config = Config::default();
        config.provider_delays = vec![ProviderDelay {
            provider: "crossref".into(),
            delay_ms: 0,
        }];

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.ids(), vec!["crossref", "semantic"]);
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let mut config = Config::default();
        config.providers.order = vec!["scopus".into()];

        let err = ProviderRegistry::from_config(&config).unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(MockProvider::new("a")));
        registry.register(Arc::new(MockProvider::new("b")));
        registry.register(Arc::new(MockProvider::new("a")));

        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert!(registry.get("c").is_none());
        assert_eq!(registry.into_providers().len(), 2);
    }
}
