//! Text sanitization for column names and free-text columns.

use super::{columns, string_values};
use crate::error::Result;
use crate::normalize::collapse_whitespace;
use polars::prelude::*;
use tracing::debug;

/// Trim, lowercase and replace spaces with `_` in every column name.
pub fn standardize_column_names(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .into_iter()
        .map(|name| (name.to_string(), standardize_name(name)))
        .filter(|(old, new)| old != new)
        .collect();

    for (old, new) in &renames {
        df.rename(old, new.as_str().into())?;
    }

    debug!("Renamed {} columns", renames.len());
    Ok(df)
}

pub(crate) fn standardize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Remove embedded newlines from `genre` and trim.
pub fn clean_genre_column(df: DataFrame) -> Result<DataFrame> {
    map_text_column(df, columns::GENRE, |value| {
        value.replace('\n', "").trim().to_string()
    })
}

/// Collapse newline runs in `one-line` to a single space and trim.
pub fn clean_one_line_column(df: DataFrame) -> Result<DataFrame> {
    map_text_column(df, columns::ONE_LINE, collapse_newlines)
}

fn collapse_newlines(value: &str) -> String {
    value
        .split('\n')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite every non-null value of a text column. Nulls stay null.
fn map_text_column(
    df: DataFrame,
    name: &str,
    transform: impl Fn(&str) -> String,
) -> Result<DataFrame> {
    let mut df = df;
    let cleaned: Vec<Option<String>> = string_values(&df, name)?
        .into_iter()
        .map(|value| value.map(|text| transform(&text)))
        .collect();

    df.replace(name, Series::new(name.into(), cleaned))?;
    debug!("Cleaned text column '{}'", name);
    Ok(df)
}

/// Collapse every whitespace run in a column to a single space.
pub(crate) fn collapse_column_whitespace(df: DataFrame, name: &str) -> Result<DataFrame> {
    map_text_column(df, name, collapse_whitespace)
}
