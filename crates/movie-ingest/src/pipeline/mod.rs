//! Pipeline module.
//!
//! This module provides the importer and its progress reporting.

mod builder;
pub mod progress;

pub use builder::{Importer, ImporterBuilder, PreparedDataset};
pub use progress::{ClosureProgressReporter, ImportStage, ProgressReporter, ProgressUpdate};
