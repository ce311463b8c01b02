//! Fixed-delay rate limiting for providers with a request quota.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::Attributes;
use crate::sources::{Provider, ProviderCapabilities, SourceError};

/// Delay recommended for Semantic Scholar: 100 requests per 5 minutes
pub const SEMANTIC_SCHOLAR_DELAY: Duration = Duration::from_secs(3);

/// Wraps a provider so every remote lookup waits a fixed delay first.
///
/// The delay is paid once per `lookup_*` call, not per HTTP request: a
/// Crossref title lookup (search, then DOI) or an OAI lookup following
/// resumption tokens sends several requests behind one delay. Every call
/// pays the full delay regardless of when the previous call happened.
/// Lookups that never reach the remote side (short titles, unsupported
/// keys) are filtered out by [`Provider::query`] before the delay applies.
#[derive(Debug)]
pub struct RateLimited<P> {
    inner: P,
    delay: Duration,
}

impl<P: Provider> RateLimited<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// The delay paid before each lookup
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Provider> Provider for RateLimited<P> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Option<Attributes>, SourceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.lookup_doi(doi).await
    }

    async fn lookup_title(&self, title: &str) -> Result<Option<Attributes>, SourceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.lookup_title(title).await
    }
}
