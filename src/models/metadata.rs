//! Metadata records merged from several providers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator used when a provider reports several subject/field tags.
pub const FIELD_SEPARATOR: &str = "<SEP>";

/// A bibliographic attribute tracked for every paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Abstract,
    ResearchField,
    Publisher,
    Date,
}

impl Attribute {
    /// Every tracked attribute, in column order
    pub const ALL: [Attribute; 4] = [
        Attribute::Abstract,
        Attribute::ResearchField,
        Attribute::Publisher,
        Attribute::Date,
    ];

    /// Column name of the attribute value in the dataset
    pub fn column(&self) -> &'static str {
        match self {
            Attribute::Abstract => "abstract",
            Attribute::ResearchField => "research_field",
            Attribute::Publisher => "publisher",
            Attribute::Date => "date",
        }
    }

    /// Column name of the attribute provenance in the dataset
    pub fn source_column(&self) -> &'static str {
        match self {
            Attribute::Abstract => "abstract_source",
            Attribute::ResearchField => "research_field_source",
            Attribute::Publisher => "publisher_source",
            Attribute::Date => "date_source",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Raw attribute mapping reported by one provider
pub type Attributes = BTreeMap<Attribute, String>;

/// What a provider answered for one lookup.
///
/// `attributes` is `None` when the provider found nothing, failed, or only
/// reported empty values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Identifier of the answering provider
    pub source: String,

    /// Attributes found, if any
    pub attributes: Option<Attributes>,
}

impl ProviderResponse {
    /// Build a response, collapsing an all-empty mapping to "no match"
    pub fn new(source: impl Into<String>, attributes: Option<Attributes>) -> Self {
        let attributes = attributes.and_then(|attrs| {
            let attrs: Attributes = attrs
                .into_iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .collect();
            (!attrs.is_empty()).then_some(attrs)
        });

        Self {
            source: source.into(),
            attributes,
        }
    }

    /// A "no match" response
    pub fn no_match(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            attributes: None,
        }
    }

    /// Whether the provider found anything
    pub fn is_match(&self) -> bool {
        self.attributes.is_some()
    }
}

/// A merged attribute value together with the provider that supplied it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub source: String,
}

/// Metadata for one paper, merged field by field across providers
///
/// Each attribute is claimed by the first provider that reports a non-empty
/// value for it and is never overwritten afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    fields: BTreeMap<Attribute, FieldValue>,
}

impl MetadataRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a provider response; returns the attributes it claimed
    pub fn merge(&mut self, response: &ProviderResponse) -> Vec<Attribute> {
        let Some(attributes) = &response.attributes else {
            return Vec::new();
        };

        let mut claimed = Vec::new();
        for attribute in Attribute::ALL {
            let Some(value) = attributes.get(&attribute) else {
                continue;
            };
            if value.trim().is_empty() || self.fields.contains_key(&attribute) {
                continue;
            }

            self.fields.insert(
                attribute,
                FieldValue {
                    value: value.clone(),
                    source: response.source.clone(),
                },
            );
            claimed.push(attribute);
        }

        claimed
    }

    /// True once every tracked attribute has a value
    pub fn is_complete(&self) -> bool {
        Attribute::ALL
            .iter()
            .all(|attribute| self.fields.contains_key(attribute))
    }

    /// True when no attribute has been claimed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, attribute: Attribute) -> Option<&FieldValue> {
        self.fields.get(&attribute)
    }

    /// Value of an attribute, if set
    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.fields.get(&attribute).map(|f| f.value.as_str())
    }

    /// Provider that supplied an attribute, if set
    pub fn source_of(&self, attribute: Attribute) -> Option<&str> {
        self.fields.get(&attribute).map(|f| f.source.as_str())
    }

    /// Iterate over the attributes set so far
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &FieldValue)> {
        self.fields.iter().map(|(attribute, field)| (*attribute, field))
    }
}
