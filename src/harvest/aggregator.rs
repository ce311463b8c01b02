use std::sync::Arc;

use crate::models::MetadataRecord;
use crate::sources::{LookupKey, Provider};

/// Queries providers in priority order and merges their answers field by field
#[derive(Debug, Clone)]
pub struct MetadataAggregator {
    providers: Vec<Arc<dyn Provider>>,
}

impl MetadataAggregator {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Collect metadata for one paper
    ///
    /// The DOI is tried against every provider before the title is. Each
    /// attribute keeps the first non-empty value found, and querying stops
    /// as soon as every attribute has one.
    pub async fn query(&self, doi: Option<&str>, title: Option<&str>) -> MetadataRecord {
        let mut record = MetadataRecord::new();

        let keys = [doi.map(LookupKey::Doi), title.map(LookupKey::Title)];
        let keys = keys
            .into_iter()
            .flatten()
            .filter(|key| !key.value().trim().is_empty());

        'keys: for key in keys {
            for provider in &self.providers {
                if record.is_complete() {
                    break 'keys;
                }

                let response = provider.query(key).await;
                let claimed = record.merge(&response);
                if !claimed.is_empty() {
                    tracing::debug!(
                        "{} supplied {:?} for {} \"{}\"",
                        response.source,
                        claimed,
                        key.kind(),
                        key.value()
                    );
                }
            }
        }

        record
    }
}
