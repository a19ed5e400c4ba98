//! Final type coercion and duplicate removal.

use super::{columns, has_column, string_values};
use crate::error::Result;
use crate::normalize::{clean_integer, clean_numeric};
use polars::prelude::*;
use tracing::debug;

/// How a numeric column is finalized.
#[derive(Debug, Clone, Copy)]
enum Coercion {
    /// Int64, unparseable values become 0.
    IntegerOrZero,
    /// Int64, unparseable values stay null.
    Integer,
    /// Float64, unparseable values become 0.
    FloatOrZero,
    /// Float64, unparseable values stay null.
    Float,
}

const FINAL_TYPES: [(&str, Coercion); 6] = [
    (columns::START_YEAR, Coercion::IntegerOrZero),
    (columns::END_YEAR, Coercion::IntegerOrZero),
    (columns::RUNTIME, Coercion::IntegerOrZero),
    (columns::VOTES, Coercion::Integer),
    (columns::RATING, Coercion::Float),
    (columns::GROSS, Coercion::FloatOrZero),
];

/// Coerce the numeric columns to their final types.
///
/// Parsing is the lenient [`clean_numeric`] / [`clean_integer`]: everything
/// but digits, `.` and `-` is dropped before parsing. Unit suffixes are lost
/// with it, so gross `"$75.47M"` is stored as `75.47` (millions, unscaled)
/// and votes `"1,234,567"` as `1234567`.
///
/// Only columns that are present are touched, so this step runs on any
/// intermediate shape of the dataset.
pub fn ensure_numeric_columns(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;

    for (name, coercion) in FINAL_TYPES {
        if !has_column(&df, name) {
            debug!("Skipping coercion of absent column '{}'", name);
            continue;
        }

        let values = string_values(&df, name)?;
        let series = coerce(name, &values, coercion);
        df.replace(name, series)?;
    }

    Ok(df)
}

fn coerce(name: &str, values: &[Option<String>], coercion: Coercion) -> Series {
    let raw = values.iter().map(|value| value.as_deref());
    match coercion {
        Coercion::IntegerOrZero => {
            let parsed: Vec<i64> = raw.map(|v| clean_integer(v).unwrap_or(0)).collect();
            Series::new(name.into(), parsed)
        }
        Coercion::Integer => {
            let parsed: Vec<Option<i64>> = raw.map(|v| clean_integer(v)).collect();
            Series::new(name.into(), parsed)
        }
        Coercion::FloatOrZero => {
            let parsed: Vec<f64> = raw.map(|v| clean_numeric(v).unwrap_or(0.0)).collect();
            Series::new(name.into(), parsed)
        }
        Coercion::Float => {
            let parsed: Vec<Option<f64>> = raw.map(|v| clean_numeric(v)).collect();
            Series::new(name.into(), parsed)
        }
    }
}

/// Drop exact duplicate rows, keeping the first occurrence in order.
pub fn remove_duplicates(df: DataFrame) -> Result<DataFrame> {
    let before = df.height();
    let df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = before - df.height();

    if removed > 0 {
        debug!("Removed {} duplicate rows", removed);
    } else {
        debug!("No duplicate rows found");
    }
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_numeric_defaults() {
        let df = df![
            "start_year" => [Some("2010"), None],
            "runtime" => [Some("121 min"), Some("n/a")],
            "votes" => [Some("1,234,567"), Some("")],
            "rating" => [Some("7.5"), None],
            "gross" => [Some("$75.47M"), None],
        ]
        .unwrap();

        let df = ensure_numeric_columns(df).unwrap();

        let start = df.column("start_year").unwrap().i64().unwrap();
        assert_eq!(start.get(0), Some(2010));
        assert_eq!(start.get(1), Some(0));

        let runtime = df.column("runtime").unwrap().i64().unwrap();
        assert_eq!(runtime.get(0), Some(121));
        assert_eq!(runtime.get(1), Some(0));

        let votes = df.column("votes").unwrap().i64().unwrap();
        assert_eq!(votes.get(0), Some(1_234_567));
        assert_eq!(votes.get(1), None);

        let rating = df.column("rating").unwrap().f64().unwrap();
        assert_eq!(rating.get(0), Some(7.5));
        assert_eq!(rating.get(1), None);

        let gross = df.column("gross").unwrap().f64().unwrap();
        assert_eq!(gross.get(0), Some(75.47));
        assert_eq!(gross.get(1), Some(0.0));
    }

    #[test]
    fn test_gross_unit_suffix_is_dropped_not_scaled() {
        let df = df!["gross" => ["$75.47M", "$0.01M", "M"]].unwrap();
        let df = ensure_numeric_columns(df).unwrap();
        let gross = df.column("gross").unwrap().f64().unwrap();
        assert_eq!(gross.get(0), Some(75.47));
        assert_eq!(gross.get(1), Some(0.01));
        assert_eq!(gross.get(2), Some(0.0));
    }

    #[test]
    fn test_ensure_numeric_accepts_already_numeric_columns() {
        let df = df!["end_year" => [Some(2012_i64), None]].unwrap();
        let df = ensure_numeric_columns(df).unwrap();
        let end = df.column("end_year").unwrap().i64().unwrap();
        assert_eq!(end.get(0), Some(2012));
        assert_eq!(end.get(1), Some(0));
    }

    #[test]
    fn test_remove_duplicates_keeps_first_in_order() {
        let df = df![
            "movies" => ["B", "A", "B", "C"],
            "rating" => [1.0, 2.0, 1.0, 3.0],
        ]
        .unwrap();

        let df = remove_duplicates(df).unwrap();
        let titles: Vec<Option<&str>> = df
            .column("movies")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(titles, vec![Some("B"), Some("A"), Some("C")]);
    }
}
