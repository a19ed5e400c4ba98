//! Error types for the movie ingest pipeline.
//!
//! Errors fall into three tiers that drive how the importer reacts:
//!
//! - **fatal** input errors abort the run before any row is written
//! - **row-level** errors roll back one row and are counted in the summary
//! - **relationship-level** problems never surface as `IngestError` at the row
//!   level; the linker logs and skips them
//!
//! Errors serialize as `{code, message}` so a summary can be written out as JSON.

use crate::store::StoreError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the ingest pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The tabular source file does not exist.
    #[error("Source file '{}' not found", .0.display())]
    SourceNotFound(PathBuf),

    /// The tabular source exists but could not be parsed.
    #[error("Failed to read source '{path}': {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Required columns are absent from the source.
    #[error("Source is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A cleaning step needed a column that is not in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The store lacks one or more of the seven catalog relations.
    #[error("Store is missing required relations: {}", .0.join(", "))]
    MissingRelations(Vec<String>),

    /// An entity name was empty or an unparsed missing-value marker.
    #[error("Invalid entity name: '{0}'")]
    InvalidName(String),

    /// A row had no usable movie title.
    #[error("Row {0} has no movie title")]
    MissingTitle(usize),

    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        IngestError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, independent of the message text.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::SourceUnreadable { .. } => "SOURCE_UNREADABLE",
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::MissingRelations(_) => "MISSING_RELATIONS",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::MissingTitle(_) => "MISSING_TITLE",
            Self::Store(_) => "STORE_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Input problems (source, columns, store relations) are fatal.
    /// Everything else is scoped to the row that raised it.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::SourceNotFound(_)
            | Self::SourceUnreadable { .. }
            | Self::MissingColumns(_)
            | Self::MissingRelations(_) => true,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Whether this error is a store uniqueness conflict.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Store(e) => e.is_unique_violation(),
            Self::WithContext { source, .. } => source.is_unique_violation(),
            _ => false,
        }
    }
}

impl Serialize for IngestError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("IngestError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IngestError::Store(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IngestError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            IngestError::InvalidName("nan".to_string()).error_code(),
            "INVALID_NAME"
        );
        assert_eq!(
            IngestError::ColumnNotFound("votes".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(IngestError::SourceNotFound(PathBuf::from("x.csv")).is_fatal());
        assert!(IngestError::MissingRelations(vec!["actor".to_string()]).is_fatal());
        assert!(!IngestError::MissingTitle(3).is_fatal());
        assert!(!IngestError::InvalidName(String::new()).is_fatal());
    }

    #[test]
    fn test_unique_violation_through_context() {
        let error = IngestError::Store(StoreError::UniqueViolation {
            relation: "genre".to_string(),
        })
        .with_context("reconciling genre 'Drama'");
        assert!(error.is_unique_violation());
        assert_eq!(error.error_code(), "STORE_ERROR");
    }

    #[test]
    fn test_error_serialization() {
        let error = IngestError::MissingColumns(vec!["votes".to_string(), "gross".to_string()]);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("MISSING_COLUMNS"));
        assert!(json.contains("votes, gross"));
    }

    #[test]
    fn test_with_context() {
        let error = IngestError::MissingTitle(7).with_context("While importing batch");
        assert!(error.to_string().contains("While importing batch"));
        assert_eq!(error.error_code(), "MISSING_TITLE");
        assert!(!error.is_fatal());
    }
}
