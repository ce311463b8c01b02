//! Core data models for catalogued papers and their merged metadata.

mod metadata;
mod paper;

pub use metadata::{
    Attribute, Attributes, FieldValue, MetadataRecord, ProviderResponse, FIELD_SEPARATOR,
};
pub use paper::{DatasetRow, PaperIdentity};
