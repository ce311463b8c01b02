//! The harvest pipeline.
//!
//! - [`MetadataAggregator`] merges provider answers for a single paper
//! - [`find_new_papers`] compares the catalog against the persisted dump
//! - [`Harvester`] runs the whole incremental update

mod aggregator;
mod differ;
mod pipeline;

pub use aggregator::MetadataAggregator;
pub use differ::find_new_papers;
pub use pipeline::{HarvestError, Harvester, RunSummary};
