//! Paper identities from the catalog and the enriched rows persisted in the dump.

use serde::{Deserialize, Serialize};

use super::metadata::{Attribute, MetadataRecord};
use crate::utils::process_abstract;

/// A paper as known to the catalog
///
/// Identified by `uri`; `title` and `doi` are taken verbatim from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaperIdentity {
    /// Catalog resource URI
    pub uri: String,

    /// Paper title
    pub title: String,

    /// Digital Object Identifier
    pub doi: Option<String>,
}

impl PaperIdentity {
    pub fn new(uri: impl Into<String>, title: impl Into<String>, doi: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            doi: doi.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Identity tuple used for comparisons, with a missing DOI as empty string
    pub fn identity_key(&self) -> (&str, &str, &str) {
        (
            self.uri.as_str(),
            self.title.as_str(),
            self.doi.as_deref().unwrap_or(""),
        )
    }
}

/// One row of the persisted dataset
///
/// Every tracked attribute is flattened into a value column and a
/// `<name>_source` column. Dumps written by older revisions only carry some of
/// these columns; missing ones read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetRow {
    pub uri: String,
    pub title: String,
    pub doi: Option<String>,
    pub abstract_source: String,
    pub r#abstract: String,
    pub processed_abstract: String,
    pub research_field: String,
    pub research_field_source: String,
    pub publisher: String,
    pub publisher_source: String,
    pub date: String,
    pub date_source: String,
}

impl DatasetRow {
    /// Column names, in the order they are written
    pub const HEADERS: [&'static str; 12] = [
        "uri",
        "title",
        "doi",
        "abstract_source",
        "abstract",
        "processed_abstract",
        "research_field",
        "research_field_source",
        "publisher",
        "publisher_source",
        "date",
        "date_source",
    ];

    /// Flatten a merged record into a row for the given paper
    pub fn from_record(paper: &PaperIdentity, record: &MetadataRecord) -> Self {
        let mut row = Self {
            uri: paper.uri.clone(),
            title: paper.title.clone(),
            doi: paper.doi.clone(),
            ..Self::default()
        };

        for (attribute, field) in record.iter() {
            let (value, source) = row.slot_mut(attribute);
            *value = field.value.clone();
            *source = field.source.clone();
        }

        row.processed_abstract = process_abstract(&row.r#abstract);
        row
    }

    /// The identity columns of this row
    pub fn identity(&self) -> PaperIdentity {
        PaperIdentity::new(self.uri.clone(), self.title.clone(), self.doi.clone())
    }

    /// Value of an attribute column
    pub fn value(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Abstract => &self.r#abstract,
            Attribute::ResearchField => &self.research_field,
            Attribute::Publisher => &self.publisher,
            Attribute::Date => &self.date,
        }
    }

    /// Provenance column of an attribute
    pub fn source(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Abstract => &self.abstract_source,
            Attribute::ResearchField => &self.research_field_source,
            Attribute::Publisher => &self.publisher_source,
            Attribute::Date => &self.date_source,
        }
    }

    fn slot_mut(&mut self, attribute: Attribute) -> (&mut String, &mut String) {
        match attribute {
            Attribute::Abstract => (&mut self.r#abstract, &mut self.abstract_source),
            Attribute::ResearchField => {
                (&mut self.research_field, &mut self.research_field_source)
            }
            Attribute::Publisher => (&mut self.publisher, &mut self.publisher_source),
            Attribute::Date => (&mut self.date, &mut self.date_source),
        }
    }
}
