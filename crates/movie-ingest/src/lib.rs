//! Movie Listing Ingest Library
//!
//! Cleans a semi-structured movie listing export and reconciles it into a
//! normalized catalog: one row per movie, shared genre/director/actor tables,
//! and join tables linking them.
//!
//! # Overview
//!
//! - **Field Normalization**: numeric coercion and multi-value splitting ([`normalize`])
//! - **Record Repair**: column-wide fixes over a polars `DataFrame` ([`cleaner`])
//! - **Reconciliation**: idempotent entity, movie and relationship upserts ([`reconcile`])
//! - **Stores**: SQLite and in-memory catalogs behind one trait ([`store`])
//! - **Progress Reporting**: per-stage and per-row updates ([`pipeline::progress`])
//!
//! Running the importer twice over the same export adds no movies, entities
//! or relationships.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use movie_ingest::{Importer, IngestConfig, SqliteStore};
//!
//! let config = IngestConfig::builder()
//!     .source_path("data/movies.csv")
//!     .database_path("movies.db")
//!     .build()?;
//!
//! let mut store = SqliteStore::open(&config.database_path)?;
//! store.bootstrap_schema()?;
//!
//! let summary = Importer::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&mut store)?;
//!
//! println!("{summary}");
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod records;
pub mod source;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use cleaner::{CleaningOutcome, CleaningStep, RecordCleaner};
pub use config::{ConfigValidationError, IngestConfig, IngestConfigBuilder};
pub use error::{IngestError, Result as IngestResult, ResultExt};
pub use normalize::{clean_numeric, split_multi_value};
pub use pipeline::{
    ClosureProgressReporter, ImportStage, Importer, ImporterBuilder, PreparedDataset,
    ProgressReporter, ProgressUpdate,
};
pub use reconcile::{EntityReconciler, MovieUpserter, RelationshipLinker};
pub use records::MovieRecord;
pub use source::ListingSource;
pub use store::{CatalogStore, CatalogTx, LinkOutcome, MemoryStore, SqliteStore, StoreError};
pub use types::{
    EntityId, EntityKind, ImportSummary, LinkStats, MovieFields, MovieId, MovieKey, Relation,
    RowFailure,
};
