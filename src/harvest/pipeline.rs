use std::sync::Arc;

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};

use super::{find_new_papers, MetadataAggregator};
use crate::catalog::{Catalog, SparqlCatalog, PAPERS_SELECT};
use crate::config::Config;
use crate::models::{Attribute, DatasetRow, PaperIdentity};
use crate::sources::{ProviderRegistry, SourceError};
use crate::storage::{source_counts, Changelog, DatasetError, DatasetStore};

/// Errors that abort a harvest run
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("Catalog query failed: {0}")]
    Catalog(#[from] SourceError),

    #[error("Failed to set up providers: {0}")]
    Provider(SourceError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Outcome of one harvest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Papers returned by the catalog
    pub catalog_papers: usize,

    /// Papers not yet in the dump
    pub new_papers: usize,

    /// Chunks processed (and dump rewrites)
    pub chunks: usize,

    /// New papers for which an abstract was found
    pub enriched: usize,
}

/// Incremental harvest: find papers missing from the dump, enrich them, persist
#[derive(Debug)]
pub struct Harvester {
    catalog: Arc<dyn Catalog>,
    aggregator: MetadataAggregator,
    store: DatasetStore,
    changelog: Changelog,
    select: String,
    chunk_size: usize,
    progress: bool,
}

impl Harvester {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        aggregator: MetadataAggregator,
        store: DatasetStore,
        changelog: Changelog,
    ) -> Self {
        Self {
            catalog,
            aggregator,
            store,
            changelog,
            select: PAPERS_SELECT.to_string(),
            chunk_size: 25,
            progress: false,
        }
    }

    /// Wire catalog, providers and storage from configuration
    ///
    /// Creates the data directory, an empty dump and an empty changelog on
    /// first use.
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let endpoint = config.catalog.endpoint.as_deref().ok_or_else(|| {
            HarvestError::Catalog(SourceError::InvalidRequest(
                "catalog.endpoint is not configured".to_string(),
            ))
        })?;
        let catalog = SparqlCatalog::new(endpoint)?;

        let registry = ProviderRegistry::from_config(config).map_err(HarvestError::Provider)?;
        let aggregator = MetadataAggregator::new(registry.into_providers());

        let store = DatasetStore::open(config.dump_path())?;
        let changelog = Changelog::open(config.changelog_path())?;

        let mut harvester = Self::new(Arc::new(catalog), aggregator, store, changelog)
            .with_chunk_size(config.storage.chunk_size);
        if let Some(select) = &config.catalog.query {
            harvester = harvester.with_select(select);
        }
        Ok(harvester)
    }

    /// Papers enriched between two rewrites of the dump; zero is treated as one
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Replace the catalog SELECT statement
    pub fn with_select(mut self, select: &str) -> Self {
        self.select = select.to_string();
        self
    }

    /// Show a progress bar per chunk
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Run with today's date in the changelog
    pub async fn run(&self) -> Result<RunSummary, HarvestError> {
        self.run_on(chrono::Local::now().date_naive()).await
    }

    /// Run and date the changelog entry `date`
    pub async fn run_on(&self, date: NaiveDate) -> Result<RunSummary, HarvestError> {
        let catalog_papers = self.catalog.query(&self.select).await?;

        let mut rows = self.store.load()?;
        let known: Vec<PaperIdentity> = rows.iter().map(DatasetRow::identity).collect();
        let new_papers = find_new_papers(&catalog_papers, &known);

        let mut summary = RunSummary {
            catalog_papers: catalog_papers.len(),
            new_papers: new_papers.len(),
            ..RunSummary::default()
        };

        tracing::info!(
            "{} papers in catalog, {} in dump, {} new",
            catalog_papers.len(),
            rows.len(),
            new_papers.len()
        );

        if new_papers.is_empty() {
            tracing::info!("Dump is up to date");
            self.changelog.prepend(&source_counts(&rows), date)?;
            return Ok(summary);
        }

        let total_chunks = new_papers.len().div_ceil(self.chunk_size);
        for (index, chunk) in new_papers.chunks(self.chunk_size).enumerate() {
            let bar = self.progress_bar(chunk.len(), index + 1, total_chunks);

            for paper in chunk {
                let record = self
                    .aggregator
                    .query(paper.doi.as_deref(), Some(paper.title.as_str()))
                    .await;
                if record.get(Attribute::Abstract).is_some() {
                    summary.enriched += 1;
                }
                rows.push(DatasetRow::from_record(paper, &record));
                bar.inc(1);
            }

            self.store.save(&rows)?;
            bar.finish_and_clear();
            summary.chunks += 1;
            tracing::info!(
                "Chunk {}/{} saved ({} rows in dump)",
                index + 1,
                total_chunks,
                rows.len()
            );
        }

        self.changelog.prepend(&source_counts(&rows), date)?;
        tracing::info!(
            "Enriched {} of {} new papers with an abstract",
            summary.enriched,
            summary.new_papers
        );

        Ok(summary)
    }

    fn progress_bar(&self, len: usize, chunk: usize, total_chunks: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template("{msg} {wide_bar:.cyan/blue} {pos}/{len} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(format!("Chunk {}/{}", chunk, total_chunks));
        bar
    }
}
