//! Crossref metadata provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Attribute, Attributes, FIELD_SEPARATOR};
use crate::sources::{Provider, ProviderCapabilities, SourceError};
use crate::utils::{titles_match, HttpClient};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Crossref provider
///
/// Uses the Crossref REST API. Title lookups resolve the best bibliographic
/// match to a DOI and then fetch the full work by DOI.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl CrossrefSource {
    /// Create a Crossref provider; a `mailto` address puts requests in the polite pool
    pub fn new(mailto: Option<&str>) -> Result<Self, SourceError> {
        let user_agent = match mailto {
            Some(mailto) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                mailto
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };

        Ok(Self {
            client: Arc::new(HttpClient::with_user_agent(&user_agent)?),
            base_url: CROSSREF_API_BASE.to_string(),
        })
    }

    /// Point the provider at another API base (for testing)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn extract(work: CRWork) -> Attributes {
        let mut attributes = Attributes::new();

        if let Some(abstract_text) = work.r#abstract {
            attributes.insert(Attribute::Abstract, abstract_text);
        }

        let subjects: Vec<String> = work
            .subject
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if !subjects.is_empty() {
            attributes.insert(Attribute::ResearchField, subjects.join(FIELD_SEPARATOR));
        }

        if let Some(publisher) = work.publisher {
            attributes.insert(Attribute::Publisher, publisher);
        }

        if let Some(date) = work.issued.as_ref().and_then(CRDate::render) {
            attributes.insert(Attribute::Date, date);
        }

        attributes
    }
}

#[async_trait]
impl Provider for CrossrefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::TITLE_LOOKUP
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Option<Attributes>, SourceError> {
        let url = format!("{}/works/{}", self.base_url, urlencoding::encode(doi));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch DOI: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(
                "Crossref returned status {} for doi \"{}\"",
                response.status(),
                doi
            );
            return Ok(None);
        }

        let data: CRWorkResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(Some(Self::extract(data.message)))
    }

    async fn lookup_title(&self, title: &str) -> Result<Option<Attributes>, SourceError> {
        let url = format!(
            "{}/works?rows=1&query.bibliographic={}",
            self.base_url,
            urlencoding::encode(title)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search Crossref: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(
                "Crossref returned status {} for title \"{}\"",
                response.status(),
                title
            );
            return Ok(None);
        }

        let data: CRSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        let doi = data.message.items.into_iter().find_map(|item| {
            let candidate = item.title.first()?;
            titles_match(candidate, title).then_some(item.doi)
        });

        match doi {
            Some(doi) => self.lookup_doi(&doi).await,
            None => Ok(None),
        }
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRWorkResponse {
    message: CRWork,
}

#[derive(Debug, Deserialize)]
struct CRWork {
    r#abstract: Option<String>,
    #[serde(default)]
    subject: Vec<String>,
    publisher: Option<String>,
    issued: Option<CRDate>,
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CRDate {
    /// Render the first date as `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    fn render(&self) -> Option<String> {
        let parts: Vec<i32> = self
            .date_parts
            .first()?
            .iter()
            .map_while(|p| *p)
            .collect();

        match parts.as_slice() {
            [] => None,
            [year] => Some(format!("{:04}", year)),
            [year, month] => Some(format!("{:04}-{:02}", year, month)),
            [year, month, day, ..] => Some(format!("{:04}-{:02}-{:02}", year, month, day)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CRSearchResponse {
    message: CRSearchMessage,
}

#[derive(Debug, Deserialize)]
struct CRSearchMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "DOI")]
    doi: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::LookupKey;
    use mockito::Matcher;

    const WORK_JSON: &str = r#"{
        "status": "ok",
        "message": {
            "DOI": "10.1/x",
            "title": ["Deep Learning Methods Survey"],
            "abstract": "<jats:p>Hello World</jats:p>",
            "subject": ["Computer Science", "Artificial Intelligence"],
            "publisher": "Springer",
            "issued": {"date-parts": [[2020, 3, 7]]}
        }
    }"#;

    fn source(server: &mockito::ServerGuard) -> CrossrefSource {
        CrossrefSource::new(None).unwrap().with_base_url(&server.url())
    }

    #[test]
    fn test_date_rendering() {
        let date = CRDate {
            date_parts: vec![vec![Some(2020), Some(3), Some(7)]],
        };
        assert_eq!(date.render().as_deref(), Some("2020-03-07"));

        let date = CRDate {
            date_parts: vec![vec![Some(2019), Some(11)]],
        };
        assert_eq!(date.render().as_deref(), Some("2019-11"));

        let date = CRDate {
            date_parts: vec![vec![None]],
        };
        assert_eq!(date.render(), None);
    }

    #[tokio::test]
    async fn test_lookup_doi_extracts_attributes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/works/10\.1".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORK_JSON)
            .create_async()
            .await;

        let attributes = source(&server).lookup_doi("10.1/x").await.unwrap().unwrap();

        assert_eq!(
            attributes.get(&Attribute::Abstract).unwrap(),
            "<jats:p>Hello World</jats:p>"
        );
        assert_eq!(
            attributes.get(&Attribute::ResearchField).unwrap(),
            "Computer Science<SEP>Artificial Intelligence"
        );
        assert_eq!(attributes.get(&Attribute::Publisher).unwrap(), "Springer");
        assert_eq!(attributes.get(&Attribute::Date).unwrap(), "2020-03-07");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_doi_not_found_is_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/works/".to_string()))
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let response = source(&server).query(LookupKey::Doi("10.1/missing")).await;
        assert_eq!(response.source, "crossref");
        assert!(response.attributes.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/works/".to_string()))
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let response = source(&server).query(LookupKey::Doi("10.1/x")).await;
        assert!(response.attributes.is_none());
    }

    #[tokio::test]
    async fn test_lookup_title_resolves_doi() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded(
                "query.bibliographic".to_string(),
                "Deep Learning Methods Survey".to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"message": {"items": [{"DOI": "10.1/x", "title": ["DEEP LEARNING METHODS SURVEY"]}]}}"#,
            )
            .create_async()
            .await;
        let work = server
            .mock("GET", Matcher::Regex(r"^/works/10\.1".to_string()))
            .with_status(200)
            .with_body(WORK_JSON)
            .create_async()
            .await;

        let attributes = source(&server)
            .lookup_title("Deep Learning Methods Survey")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(attributes.get(&Attribute::Publisher).unwrap(), "Springer");
        search.assert_async().await;
        work.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_title_rejects_different_title() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"message": {"items": [{"DOI": "10.1/y", "title": ["Deep Learning Methods Revisited"]}]}}"#,
            )
            .create_async()
            .await;
        let work = server
            .mock("GET", Matcher::Regex(r"^/works/10\.1".to_string()))
            .with_status(200)
            .with_body(WORK_JSON)
            .expect(0)
            .create_async()
            .await;

        let result = source(&server)
            .lookup_title("Deep Learning Methods Survey")
            .await
            .unwrap();

        assert!(result.is_none());
        work.assert_async().await;
    }
}
