//! Tabular input: reading the listing export.

use crate::cleaner::{columns, standardize_name};
use crate::error::{IngestError, Result};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A CSV listing export on disk.
#[derive(Debug, Clone)]
pub struct ListingSource {
    path: PathBuf,
}

impl ListingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the export with every column as text and check the required
    /// columns are there.
    ///
    /// Column names are matched after trimming, lowercasing and replacing
    /// spaces, so `" RunTime"` satisfies `runtime`. The returned frame keeps
    /// the original names; renaming is the repair stage's first step.
    pub fn load(&self) -> Result<DataFrame> {
        if !self.path.exists() {
            return Err(IngestError::SourceNotFound(self.path.clone()));
        }

        info!("Loading listing from {}", self.path.display());

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .and_then(|reader| reader.finish())
            .map_err(|e| IngestError::SourceUnreadable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        validate_columns(&df)?;
        debug!("Loaded {} rows x {} columns", df.height(), df.width());
        Ok(df)
    }
}

/// Fail with [`IngestError::MissingColumns`] listing every required column
/// the frame lacks.
pub fn validate_columns(df: &DataFrame) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| standardize_name(name))
        .collect();

    let missing: Vec<String> = columns::REQUIRED
        .iter()
        .filter(|required| !present.iter().any(|name| name == *required))
        .map(|required| required.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "MOVIES,YEAR,GENRE,RATING,ONE-LINE,STARS,VOTES,RunTime,Gross";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let err = ListingSource::new("/definitely/not/here.csv")
            .load()
            .unwrap_err();
        assert!(matches!(err, IngestError::SourceNotFound(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_reads_everything_as_text() {
        let file = write_csv(&format!(
            "{HEADER}\nFoo,(2010–2012),Drama,7.5,A story,\"Stars: A\",\"1,234\",121,\n"
        ));
        let df = ListingSource::new(file.path()).load().unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(df.column("RATING").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("VOTES").unwrap().str().unwrap().get(0), Some("1,234"));
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let file = write_csv("MOVIES,YEAR,GENRE\nFoo,(2010),Drama\n");
        let err = ListingSource::new(file.path()).load().unwrap_err();
        match err {
            IngestError::MissingColumns(missing) => {
                assert_eq!(
                    missing,
                    vec!["rating", "one-line", "stars", "votes", "runtime", "gross"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
