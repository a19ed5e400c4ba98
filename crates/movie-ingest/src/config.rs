//! Configuration for an ingest run.
//!
//! All run parameters travel in an explicit [`IngestConfig`] value handed to
//! the importer, so the core can run against an in-memory store in tests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cap on the number of actors linked per movie.
pub const DEFAULT_ACTOR_LIMIT: usize = 20;

/// Configuration for the ingest pipeline.
///
/// Use [`IngestConfig::builder()`] to create a configuration with the fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use movie_ingest::config::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .source_path("data/movies.csv")
///     .database_path("catalog.db")
///     .bootstrap_schema(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// CSV export to ingest.
    /// Default: "data/movies.csv"
    pub source_path: PathBuf,

    /// SQLite database holding the catalog.
    /// Default: "movies.db"
    pub database_path: PathBuf,

    /// Maximum number of actors linked per movie, applied after splitting the
    /// stars field and before filtering.
    /// Default: 20
    pub actor_limit: usize,

    /// Create the seven catalog relations when they are missing.
    /// Default: false
    pub bootstrap_schema: bool,

    /// Number of rows logged as initial/final data samples.
    /// Default: 5
    pub sample_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/movies.csv"),
            database_path: PathBuf::from("movies.db"),
            actor_limit: DEFAULT_ACTOR_LIMIT,
            bootstrap_schema: false,
            sample_rows: 5,
        }
    }
}

impl IngestConfig {
    /// Create a new configuration builder.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("source_path".to_string()));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath(
                "database_path".to_string(),
            ));
        }

        if self.actor_limit == 0 {
            return Err(ConfigValidationError::InvalidActorLimit(self.actor_limit));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Path for '{0}' must not be empty")]
    EmptyPath(String),

    #[error("Invalid actor limit: {0} (must be at least 1)")]
    InvalidActorLimit(usize),
}

/// Builder for [`IngestConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    source_path: Option<PathBuf>,
    database_path: Option<PathBuf>,
    actor_limit: Option<usize>,
    bootstrap_schema: Option<bool>,
    sample_rows: Option<usize>,
}

impl IngestConfigBuilder {
    /// Set the CSV export to ingest.
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Set the SQLite database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the per-movie actor cap.
    pub fn actor_limit(mut self, limit: usize) -> Self {
        self.actor_limit = Some(limit);
        self
    }

    /// Create missing catalog relations before importing.
    pub fn bootstrap_schema(mut self, bootstrap: bool) -> Self {
        self.bootstrap_schema = Some(bootstrap);
        self
    }

    /// Set how many rows are logged as data samples.
    pub fn sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `IngestConfig` or an error if validation fails.
    pub fn build(self) -> Result<IngestConfig, ConfigValidationError> {
        let defaults = IngestConfig::default();
        let config = IngestConfig {
            source_path: self.source_path.unwrap_or(defaults.source_path),
            database_path: self.database_path.unwrap_or(defaults.database_path),
            actor_limit: self.actor_limit.unwrap_or(defaults.actor_limit),
            bootstrap_schema: self.bootstrap_schema.unwrap_or(defaults.bootstrap_schema),
            sample_rows: self.sample_rows.unwrap_or(defaults.sample_rows),
        };

        config.validate()?;
        Ok(config)
    }
}
