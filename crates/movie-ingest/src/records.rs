//! Typed rows extracted from the cleaned dataset.
//!
//! The repair stage works column-wise on a `DataFrame`; the reconciliation
//! engine works row-wise. [`extract_records`] bridges the two and builds the
//! JSON audit payload stored with each movie.

use crate::cleaner::{columns, has_column};
use crate::error::Result;
use crate::normalize::{clean_integer, clean_numeric, split_multi_value};
use crate::types::{MovieFields, MovieKey};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One cleaned listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Position in the cleaned dataset.
    pub row_index: usize,
    pub title: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub rating: Option<f64>,
    pub gross: Option<f64>,
    pub runtime_minutes: Option<i32>,
    pub votes: Option<i64>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub stars: Option<String>,
    /// Every column of the cleaned row, for audit.
    pub payload: Value,
}

impl MovieRecord {
    /// Lookup key, or `None` when the row has no usable title.
    pub fn key(&self) -> Option<MovieKey> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(|title| MovieKey::new(title, self.start_year))
    }

    pub fn fields(&self) -> MovieFields {
        MovieFields {
            end_year: self.end_year,
            rating: self.rating,
            gross: self.gross,
            runtime_minutes: self.runtime_minutes,
        }
    }

    pub fn genres(&self) -> Vec<String> {
        split_multi_value(self.genre.as_deref())
    }

    pub fn directors(&self) -> Vec<String> {
        split_multi_value(self.director.as_deref())
    }

    pub fn actors(&self) -> Vec<String> {
        split_multi_value(self.stars.as_deref())
    }
}

/// Build one [`MovieRecord`] per row of a cleaned dataset.
///
/// Years keep the repair stage's fill value of 0, so a row without a year is
/// keyed on `(title, 0)` and never matches a dated movie of the same title.
pub fn extract_records(df: &DataFrame) -> Result<Vec<MovieRecord>> {
    let titles = text_column(df, columns::TITLE)?;
    let genres = text_column(df, columns::GENRE)?;
    let directors = text_column(df, columns::DIRECTOR)?;
    let stars = text_column(df, columns::STARS)?;

    let start_years = integer_column(df, columns::START_YEAR)?;
    let end_years = integer_column(df, columns::END_YEAR)?;
    let runtimes = integer_column(df, columns::RUNTIME)?;
    let votes = integer_column(df, columns::VOTES)?;
    let ratings = float_column(df, columns::RATING)?;
    let grosses = float_column(df, columns::GROSS)?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        records.push(MovieRecord {
            row_index: row,
            title: titles[row].clone(),
            start_year: narrow(start_years[row]),
            end_year: narrow(end_years[row]),
            rating: ratings[row],
            gross: grosses[row],
            runtime_minutes: narrow(runtimes[row]),
            votes: votes[row],
            genre: genres[row].clone(),
            director: directors[row].clone(),
            stars: stars[row].clone(),
            payload: row_payload(df, row)?,
        });
    }
    Ok(records)
}

fn narrow(value: Option<i64>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

/// Values of a column as strings; an absent column reads as all-null.
fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if !has_column(df, name) {
        return Ok(vec![None; df.height()]);
    }
    let series = df
        .column(name)?
        .cast(&DataType::String)?
        .take_materialized_series();
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(|text| text.trim().to_string()))
        .collect())
}

fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    Ok(text_column(df, name)?
        .iter()
        .map(|value| clean_integer(value.as_deref()))
        .collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(text_column(df, name)?
        .iter()
        .map(|value| clean_numeric(value.as_deref()))
        .collect())
}

/// JSON object of every column in a row. Nulls and NaN become `null`,
/// strings are trimmed, numbers stay numbers.
pub fn row_payload(df: &DataFrame, row: usize) -> Result<Value> {
    let mut object = Map::new();
    for column in df.get_columns() {
        let value = column.as_materialized_series().get(row)?;
        object.insert(column.name().to_string(), any_value_to_json(&value));
    }
    Ok(Value::Object(object))
}

fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::String(s.trim().to_string()),
        AnyValue::StringOwned(s) => Value::String(s.trim().to_string()),
        AnyValue::Int8(n) => Value::from(*n),
        AnyValue::Int16(n) => Value::from(*n),
        AnyValue::Int32(n) => Value::from(*n),
        AnyValue::Int64(n) => Value::from(*n),
        AnyValue::UInt8(n) => Value::from(*n),
        AnyValue::UInt16(n) => Value::from(*n),
        AnyValue::UInt32(n) => Value::from(*n),
        AnyValue::UInt64(n) => Value::from(*n),
        AnyValue::Float32(n) => float_to_json(f64::from(*n)),
        AnyValue::Float64(n) => float_to_json(*n),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(n: f64) -> Value {
    serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
}
