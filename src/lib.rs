//! # Paper Harvest
//!
//! Keeps a CSV dump of the papers in a SPARQL catalog enriched with
//! abstracts, research fields, publishers and publication dates collected
//! from scholarly metadata APIs.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PaperIdentity, MetadataRecord, DatasetRow)
//! - [`sources`]: Metadata providers behind a trait with a uniform lookup contract
//! - [`catalog`]: Where the list of papers comes from
//! - [`harvest`]: Aggregation across providers and the incremental update run
//! - [`storage`]: The CSV dump and the changelog
//! - [`utils`]: HTTP client and text helpers
//! - [`config`]: Configuration management

pub mod catalog;
pub mod config;
pub mod harvest;
pub mod models;
pub mod sources;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use harvest::{Harvester, MetadataAggregator};
pub use models::{MetadataRecord, PaperIdentity};
pub use sources::{Provider, ProviderRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
