//! Persistence of the enriched dataset and its changelog.
//!
//! The dump is a CSV table with one [`DatasetRow`] per paper, rewritten in
//! full on every save. The changelog is a plain text file that gets a dated
//! block of per-source abstract counts prepended after each run.

mod changelog;
mod dataset;

pub use changelog::Changelog;
pub use dataset::DatasetStore;

use crate::models::DatasetRow;
use std::collections::HashMap;

/// Label counted for rows without an abstract source
pub const NO_RECORD: &str = "no_record";

/// Errors from reading or writing the dump and the changelog
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: tempfile::PersistError,
    },
}

impl DatasetError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Count rows per abstract source
///
/// Rows without an abstract source count as [`NO_RECORD`]. Ordered by count
/// descending, ties by source name.
pub fn source_counts(rows: &[DatasetRow]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let source = match row.abstract_source.trim() {
            "" => NO_RECORD,
            source => source,
        };
        *counts.entry(source).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(source, count)| (source.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
