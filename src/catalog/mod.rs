//! Paper catalogs: where the list of papers to enrich comes from.
//!
//! A [`Catalog`] answers a SELECT statement with one [`PaperIdentity`] per
//! row. Columns are mapped by position: the first variable is the paper URI,
//! the second its title and the third its DOI.

use async_trait::async_trait;

use crate::models::PaperIdentity;
use crate::sources::SourceError;

mod sparql;

pub use sparql::SparqlCatalog;

/// Select every paper with its label and optional DOI
pub const PAPERS_SELECT: &str = r#"
PREFIX orkgp: <http://orkg.org/orkg/predicate/>
PREFIX orkgc: <http://orkg.org/orkg/class/>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT ?paper ?paper_title ?doi
    WHERE {
           ?paper rdf:type orkgc:Paper ;
                  rdfs:label ?paper_title .

           OPTIONAL { ?paper orkgp:P26 ?doi } .
    }
"#;

/// A source of paper identities
#[async_trait]
pub trait Catalog: Send + Sync + std::fmt::Debug {
    /// Run a SELECT statement and map every row to a paper identity
    async fn query(&self, select: &str) -> Result<Vec<PaperIdentity>, SourceError>;
}

/// A catalog backed by a fixed list of papers
///
/// The SELECT statement is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    papers: Vec<PaperIdentity>,
}

impl StaticCatalog {
    pub fn new(papers: Vec<PaperIdentity>) -> Self {
        Self { papers }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn query(&self, _select: &str) -> Result<Vec<PaperIdentity>, SourceError> {
        Ok(self.papers.clone())
    }
}
