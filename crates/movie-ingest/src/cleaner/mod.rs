//! Record repair stage.
//!
//! Column-wide repairs over the raw listing export:
//! - Standardizing column names
//! - Splitting `(2010–2022)` year ranges into start/end years
//! - Stripping stray newlines from genre and one-line text
//! - Decomposing the combined `Director: .. | Stars: ..` cell
//! - Undoing the votes/runtime/gross column shift
//! - Coercing numeric columns to their final types
//! - Removing exact duplicate rows
//!
//! Every step is an independent `fn(DataFrame) -> Result<DataFrame>` and never
//! assumes a later step ran. [`RecordCleaner`] runs them in the standard order.

mod converters;
mod extractors;
mod sanitizers;
mod shift;

pub use converters::{ensure_numeric_columns, remove_duplicates};
pub use extractors::{extract_director_and_stars, extract_year_ranges};
pub use sanitizers::{clean_genre_column, clean_one_line_column, standardize_column_names};
pub use shift::fix_column_shift;

pub(crate) use sanitizers::standardize_name;

use crate::error::{IngestError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Column names after standardization.
pub mod columns {
    pub const TITLE: &str = "movies";
    pub const YEAR: &str = "year";
    pub const GENRE: &str = "genre";
    pub const RATING: &str = "rating";
    pub const ONE_LINE: &str = "one-line";
    pub const STARS: &str = "stars";
    pub const VOTES: &str = "votes";
    pub const RUNTIME: &str = "runtime";
    pub const GROSS: &str = "gross";

    pub const START_YEAR: &str = "start_year";
    pub const END_YEAR: &str = "end_year";
    pub const DIRECTOR: &str = "director";

    /// Columns the source must provide.
    pub const REQUIRED: [&str; 9] = [
        TITLE, YEAR, GENRE, RATING, ONE_LINE, STARS, VOTES, RUNTIME, GROSS,
    ];
}

/// One repair step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStep {
    StandardizeColumnNames,
    ExtractYearRanges,
    CleanGenre,
    CleanOneLine,
    ExtractDirectorAndStars,
    FixColumnShift,
    EnsureNumeric,
    RemoveDuplicates,
}

impl CleaningStep {
    /// The fixed order the repair stage runs in.
    pub const STANDARD_ORDER: [CleaningStep; 8] = [
        CleaningStep::StandardizeColumnNames,
        CleaningStep::ExtractYearRanges,
        CleaningStep::CleanGenre,
        CleaningStep::CleanOneLine,
        CleaningStep::ExtractDirectorAndStars,
        CleaningStep::FixColumnShift,
        CleaningStep::EnsureNumeric,
        CleaningStep::RemoveDuplicates,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::StandardizeColumnNames => "Standardizing column names",
            Self::ExtractYearRanges => "Extracting year ranges",
            Self::CleanGenre => "Cleaning genre column",
            Self::CleanOneLine => "Cleaning one-line column",
            Self::ExtractDirectorAndStars => "Extracting director and stars",
            Self::FixColumnShift => "Fixing column shift",
            Self::EnsureNumeric => "Ensuring numeric columns",
            Self::RemoveDuplicates => "Removing duplicates",
        }
    }

    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        match self {
            Self::StandardizeColumnNames => standardize_column_names(df),
            Self::ExtractYearRanges => extract_year_ranges(df),
            Self::CleanGenre => clean_genre_column(df),
            Self::CleanOneLine => clean_one_line_column(df),
            Self::ExtractDirectorAndStars => extract_director_and_stars(df),
            Self::FixColumnShift => fix_column_shift(df),
            Self::EnsureNumeric => ensure_numeric_columns(df),
            Self::RemoveDuplicates => remove_duplicates(df),
        }
    }
}

/// Result of running the repair stage.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    pub rows_before: usize,
    pub duplicates_removed: usize,
}

/// Runs repair steps over a dataset.
#[derive(Debug, Clone)]
pub struct RecordCleaner {
    steps: Vec<CleaningStep>,
}

impl Default for RecordCleaner {
    fn default() -> Self {
        Self::standard()
    }
}

impl RecordCleaner {
    /// All steps in the standard order.
    pub fn standard() -> Self {
        Self {
            steps: CleaningStep::STANDARD_ORDER.to_vec(),
        }
    }

    /// A custom sequence of steps, run as given.
    pub fn with_steps(steps: impl Into<Vec<CleaningStep>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    pub fn steps(&self) -> &[CleaningStep] {
        &self.steps
    }

    pub fn run(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let rows_before = df.height();
        let mut duplicates_removed = 0;
        let mut df = df;

        info!("Cleaning {} rows...", rows_before);

        for (index, step) in self.steps.iter().enumerate() {
            debug!("[{}/{}] {}", index + 1, self.steps.len(), step.name());
            let before = df.height();
            df = step.apply(df)?;
            if *step == CleaningStep::RemoveDuplicates {
                duplicates_removed += before - df.height();
            }
        }

        info!(
            "Cleaning complete: {} rows ({} duplicates removed)",
            df.height(),
            duplicates_removed
        );

        Ok(CleaningOutcome {
            data: df,
            rows_before,
            duplicates_removed,
        })
    }
}

/// Fail with [`IngestError::ColumnNotFound`] unless the column exists.
pub(crate) fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(IngestError::ColumnNotFound(name.to_string()))
    }
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names()
        .iter()
        .any(|column| column.as_str() == name)
}

/// A column's values as owned strings, whatever its dtype.
pub(crate) fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    require_column(df, name)?;
    let series = df
        .column(name)?
        .cast(&DataType::String)?
        .take_materialized_series();
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}
