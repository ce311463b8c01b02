//! SPARQL endpoint catalog.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::Catalog;
use crate::models::PaperIdentity;
use crate::sources::SourceError;
use crate::utils::HttpClient;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Catalog that queries a hosted triple store over the SPARQL protocol
#[derive(Debug, Clone)]
pub struct SparqlCatalog {
    client: Arc<HttpClient>,
    endpoint: String,
}

impl SparqlCatalog {
    pub fn new(endpoint: &str) -> Result<Self, SourceError> {
        if endpoint.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "SPARQL endpoint must not be empty".to_string(),
            ));
        }

        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            endpoint: endpoint.to_string(),
        })
    }

    /// Map result bindings to papers by the position of the projected variables
    fn to_papers(results: SparqlResults) -> Result<Vec<PaperIdentity>, SourceError> {
        let vars = results.head.vars;
        if vars.len() < 2 {
            return Err(SourceError::Parse(format!(
                "Expected at least 2 projected variables, got {}",
                vars.len()
            )));
        }

        let value = |row: &HashMap<String, SparqlTerm>, index: usize| -> String {
            vars.get(index)
                .and_then(|var| row.get(var))
                .map(|term| term.value.clone())
                .unwrap_or_default()
        };

        let papers = results
            .results
            .bindings
            .iter()
            .map(|row| {
                let doi = value(row, 2);
                PaperIdentity::new(value(row, 0), value(row, 1), Some(doi))
            })
            .collect();

        Ok(papers)
    }
}

#[async_trait]
impl Catalog for SparqlCatalog {
    async fn query(&self, select: &str) -> Result<Vec<PaperIdentity>, SourceError> {
        let url = format!(
            "{}?query={}",
            self.endpoint,
            urlencoding::encode(select)
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to query catalog: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Catalog returned status: {}",
                response.status()
            )));
        }

        let results: SparqlResults = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse SPARQL results: {}", e)))?;

        let papers = Self::to_papers(results)?;
        tracing::info!("Catalog returned {} papers", papers.len());
        Ok(papers)
    }
}

// ===== SPARQL JSON Results Types =====

#[derive(Debug, Deserialize)]
struct SparqlResults {
    head: SparqlHead,
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PAPERS_SELECT;
    use mockito::Matcher;

    const RESULTS_JSON: &str = r#"{
        "head": {"vars": ["paper", "paper_title", "doi"]},
        "results": {"bindings": [
            {
                "paper": {"type": "uri", "value": "http://orkg.org/orkg/resource/R1"},
                "paper_title": {"type": "literal", "value": "Deep Learning Methods Survey"},
                "doi": {"type": "literal", "value": "10.1/x"}
            },
            {
                "paper": {"type": "uri", "value": "http://orkg.org/orkg/resource/R2"},
                "paper_title": {"type": "literal", "value": "AI"}
            }
        ]}
    }"#;

    #[test]
    fn test_empty_endpoint_rejected() {
        assert!(SparqlCatalog::new("  ").is_err());
    }

    #[tokio::test]
    async fn test_query_maps_rows_positionally() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sparql")
            .match_query(Matcher::UrlEncoded(
                "query".to_string(),
                PAPERS_SELECT.to_string(),
            ))
            .match_header("accept", SPARQL_RESULTS_JSON)
            .with_status(200)
            .with_header("content-type", SPARQL_RESULTS_JSON)
            .with_body(RESULTS_JSON)
            .create_async()
            .await;

        let catalog = SparqlCatalog::new(&format!("{}/sparql", server.url())).unwrap();
        let papers = catalog.query(PAPERS_SELECT).await.unwrap();

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].uri, "http://orkg.org/orkg/resource/R1");
        assert_eq!(papers[0].title, "Deep Learning Methods Survey");
        assert_eq!(papers[0].doi.as_deref(), Some("10.1/x"));
        assert_eq!(papers[1].title, "AI");
        assert_eq!(papers[1].doi, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_renamed_variables_still_map_by_position() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/sparql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"head": {"vars": ["p", "t"]},
                    "results": {"bindings": [{"p": {"value": "u"}, "t": {"value": "Some Paper Title"}}]}}"#,
            )
            .create_async()
            .await;

        let catalog = SparqlCatalog::new(&format!("{}/sparql", server.url())).unwrap();
        let papers = catalog.query("SELECT ?p ?t WHERE {}").await.unwrap();

        assert_eq!(papers, vec![PaperIdentity::new("u", "Some Paper Title", None)]);
    }

    #[tokio::test]
    async fn test_server_error_aborts() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/sparql")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let catalog = SparqlCatalog::new(&format!("{}/sparql", server.url())).unwrap();
        let err = catalog.query(PAPERS_SELECT).await.unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));
    }
}
