//! The importer: source -> repair stage -> per-row reconciliation.

use crate::cleaner::RecordCleaner;
use crate::config::{ConfigValidationError, IngestConfig};
use crate::error::{IngestError, Result, ResultExt};
use crate::pipeline::progress::{
    ClosureProgressReporter, ImportStage, ProgressReporter, ProgressUpdate,
};
use crate::reconcile::{MovieUpserter, RelationshipLinker};
use crate::records::{MovieRecord, extract_records};
use crate::source::ListingSource;
use crate::store::CatalogStore;
use crate::types::{EntityKind, ImportSummary, LinkStats, RowFailure};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Cleaned dataset ready for import.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub data: DataFrame,
    pub records: Vec<MovieRecord>,
    pub rows_before: usize,
    pub duplicates_removed: usize,
}

/// Imports a movie listing into a catalog store.
///
/// Rows are imported one at a time, each in its own transaction. A row that
/// fails is rolled back and recorded in the summary; the run carries on.
///
/// # Example
///
/// ```rust,ignore
/// use movie_ingest::{Importer, IngestConfig, SqliteStore};
///
/// let config = IngestConfig::builder().source_path("movies.csv").build()?;
/// let mut store = SqliteStore::open(&config.database_path)?;
///
/// let summary = Importer::builder()
///     .config(config)
///     .build()?
///     .run(&mut store)?;
/// println!("{summary}");
/// ```
pub struct Importer {
    config: IngestConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: RecordCleaner,
    upserter: MovieUpserter,
    linker: RelationshipLinker,
}

static_assertions::assert_impl_all!(Importer: Send);

impl Importer {
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::default()
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run a full import from `config.source_path` into `store`.
    ///
    /// Fails without touching the store when the store is unreachable or
    /// lacks a relation, or when the source is missing, unreadable or lacks
    /// a required column.
    pub fn run(&self, store: &mut dyn CatalogStore) -> Result<ImportSummary> {
        match self.run_internal(store) {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Imported {} of {} rows",
                    summary.rows_succeeded,
                    summary.rows_attempted()
                )));
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Import failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_internal(&self, store: &mut dyn CatalogStore) -> Result<ImportSummary> {
        let started = Instant::now();

        self.report_progress(ProgressUpdate::new(
            ImportStage::Loading,
            0.0,
            "Checking catalog store...",
        ));
        self.verify_store(store)?;

        let df = ListingSource::new(&self.config.source_path).load()?;
        let rows_read = df.height();
        self.report_progress(ProgressUpdate::new(
            ImportStage::Loading,
            1.0,
            format!("Loaded {rows_read} rows"),
        ));

        let prepared = self.prepare(df)?;
        let mut summary = self.import_verified(store, &prepared.records);

        summary.rows_read = rows_read;
        summary.duplicates_removed = prepared.duplicates_removed;
        summary.duration_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Check the store answers and exposes all seven relations.
    pub fn verify_store(&self, store: &dyn CatalogStore) -> Result<()> {
        store.ping().context("testing store connection")?;

        let missing = store.missing_relations()?;
        if !missing.is_empty() {
            return Err(IngestError::MissingRelations(
                missing
                    .iter()
                    .map(|relation| relation.name().to_string())
                    .collect(),
            ));
        }
        debug!("Store connection OK, all relations present");
        Ok(())
    }

    /// Run the repair stage and extract typed records.
    pub fn prepare(&self, df: DataFrame) -> Result<PreparedDataset> {
        self.report_progress(ProgressUpdate::new(
            ImportStage::Cleaning,
            0.0,
            "Cleaning records...",
        ));

        if self.config.sample_rows > 0 {
            debug!("Initial data sample:\n{}", df.head(Some(self.config.sample_rows)));
        }

        let outcome = self.cleaner.run(df)?;

        if self.config.sample_rows > 0 {
            debug!(
                "Final cleaned data sample:\n{}",
                outcome.data.head(Some(self.config.sample_rows))
            );
        }

        let records = extract_records(&outcome.data)?;
        self.report_progress(ProgressUpdate::new(
            ImportStage::Cleaning,
            1.0,
            format!("{} rows ready for import", records.len()),
        ));

        Ok(PreparedDataset {
            data: outcome.data,
            records,
            rows_before: outcome.rows_before,
            duplicates_removed: outcome.duplicates_removed,
        })
    }

    /// Import records row by row.
    ///
    /// Each row's movie upsert and links commit together; a failed row is
    /// rolled back and recorded without stopping the run.
    pub fn import_records(
        &self,
        store: &mut dyn CatalogStore,
        records: &[MovieRecord],
    ) -> Result<ImportSummary> {
        self.verify_store(store)?;
        Ok(self.import_verified(store, records))
    }

    /// Row loop of [`import_records`](Self::import_records), for a store that
    /// already passed [`verify_store`](Self::verify_store).
    fn import_verified(
        &self,
        store: &mut dyn CatalogStore,
        records: &[MovieRecord],
    ) -> ImportSummary {
        let started = Instant::now();
        let total = records.len();
        let mut summary = ImportSummary::new();
        summary.rows_read = total;
        summary.rows_cleaned = total;

        info!("Importing {} rows...", total);

        for (position, record) in records.iter().enumerate() {
            match self.import_row(store, record) {
                Ok(links) => {
                    debug!(
                        "✓ Processed movie: {}",
                        record.title.as_deref().unwrap_or_default()
                    );
                    summary.record_success(&links);
                }
                Err(e) => {
                    warn!("✗ Error processing row {}: {}", record.row_index, e);
                    summary.record_failure(RowFailure {
                        row_index: record.row_index,
                        title: record.title.clone(),
                        code: e.error_code().to_string(),
                        message: e.to_string(),
                    });
                }
            }

            self.report_progress(ProgressUpdate::with_items(
                ImportStage::Importing,
                position + 1,
                total,
                format!("Row {}/{}", position + 1, total),
            ));
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Data import completed. Successful: {}, Errors: {}",
            summary.rows_succeeded, summary.rows_failed
        );
        summary
    }

    fn import_row(
        &self,
        store: &mut dyn CatalogStore,
        record: &MovieRecord,
    ) -> Result<BTreeMap<EntityKind, LinkStats>> {
        let key = record
            .key()
            .ok_or(IngestError::MissingTitle(record.row_index))?;

        let mut tx = store.begin()?;
        let movie = self
            .upserter
            .upsert(tx.as_mut(), &key, &record.fields(), &record.payload)?;
        let links = self.linker.link_record(tx.as_mut(), movie, record);
        tx.commit()
            .context(format!("committing movie '{}'", key.title))?;

        Ok(links)
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`Importer`].
#[derive(Default)]
pub struct ImporterBuilder {
    config: Option<IngestConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(ImporterBuilder: Send);

impl ImporterBuilder {
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during the import.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the importer.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Importer, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Importer {
            linker: RelationshipLinker::new(config.actor_limit),
            config,
            progress_reporter: self.progress_reporter,
            cleaner: RecordCleaner::standard(),
            upserter: MovieUpserter,
        })
    }
}
