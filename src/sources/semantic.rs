//! Semantic Scholar metadata provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Attribute, Attributes, FIELD_SEPARATOR};
use crate::sources::{Provider, ProviderCapabilities, SourceError};
use crate::utils::{titles_match, HttpClient};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const PAPER_FIELDS: &str = "title,abstract,fieldsOfStudy,venue,publicationDate,year";

/// Semantic Scholar provider
///
/// Uses the Semantic Scholar Graph API. The unauthenticated quota is
/// 100 requests per 5 minutes, so the registry wraps this provider in a
/// [`crate::sources::RateLimited`] delay.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarSource {
    /// Create a new Semantic Scholar provider with an optional API key
    pub fn new(api_key: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            base_url: SEMANTIC_API_BASE.to_string(),
            api_key,
        })
    }

    /// Point the provider at another API base (for testing)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build request URL
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Add API key to request headers if available
    fn add_api_key_if_present(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref key) = self.api_key {
            builder.header("x-api-key", key)
        } else {
            builder
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        what: &str,
    ) -> Result<Option<T>, SourceError> {
        let response = self
            .add_api_key_if_present(self.client.get(&self.build_url(endpoint)))
            .send()
            .await
            .map_err(|e| {
                SourceError::Network(format!("Failed to query Semantic Scholar: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                "Semantic Scholar returned status {} for {}",
                response.status(),
                what
            );
            return Ok(None);
        }

        let data = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(Some(data))
    }

    /// Map Semantic Scholar paper data onto tracked attributes
    fn extract(paper: S2Paper) -> Attributes {
        let mut attributes = Attributes::new();

        if let Some(abstract_text) = paper.r#abstract {
            attributes.insert(Attribute::Abstract, abstract_text);
        }

        let fields: Vec<String> = paper
            .fields_of_study
            .unwrap_or_default()
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .collect();
        if !fields.is_empty() {
            attributes.insert(Attribute::ResearchField, fields.join(FIELD_SEPARATOR));
        }

        if let Some(venue) = paper.venue {
            attributes.insert(Attribute::Publisher, venue);
        }

        let date = paper
            .publication_date
            .or_else(|| paper.year.map(|y| y.to_string()));
        if let Some(date) = date {
            attributes.insert(Attribute::Date, date);
        }

        attributes
    }
}

#[async_trait]
impl Provider for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::TITLE_LOOKUP
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Option<Attributes>, SourceError> {
        let endpoint = format!(
            "/paper/DOI:{}?fields={}",
            urlencoding::encode(doi),
            PAPER_FIELDS
        );

        let paper: Option<S2Paper> = self.fetch(&endpoint, &format!("doi \"{}\"", doi)).await?;
        Ok(paper.map(Self::extract))
    }

    async fn lookup_title(&self, title: &str) -> Result<Option<Attributes>, SourceError> {
        let endpoint = format!(
            "/paper/search?query={}&fields={}",
            urlencoding::encode(title),
            PAPER_FIELDS
        );

        let data: Option<S2SearchResponse> =
            self.fetch(&endpoint, &format!("title \"{}\"", title)).await?;

        let paper = data.and_then(|data| {
            data.data.into_iter().find(|paper| {
                let has_abstract = paper
                    .r#abstract
                    .as_deref()
                    .is_some_and(|a| !a.trim().is_empty());
                let same_title = paper
                    .title
                    .as_deref()
                    .is_some_and(|t| titles_match(t, title));
                same_title && has_abstract
            })
        });

        Ok(paper.map(Self::extract))
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2Paper {
    title: Option<String>,
    r#abstract: Option<String>,
    #[serde(rename = "fieldsOfStudy")]
    fields_of_study: Option<Vec<String>>,
    venue: Option<String>,
    #[serde(rename = "publicationDate")]
    publication_date: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}
