//! Pattern extraction: year ranges and the combined director/stars cell.

use super::sanitizers::collapse_column_whitespace;
use super::{columns, string_values};
use crate::error::Result;
use crate::normalize::UNKNOWN_SENTINEL;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((.*?)\)").expect("Invalid regex: parenthesized"));

static YEAR_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[–-]").expect("Invalid regex: year separator"));

static DIRECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Director:\s*(.*?)(?:\s*\|\s*Stars:|\s*Stars:|$)")
        .expect("Invalid regex: director")
});

static STARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Stars:\s*(.*?)\s*$").expect("Invalid regex: stars"));

/// Split `year` into `start_year` and `end_year`, then drop `year`.
///
/// Only the first parenthesized substring is considered. `"(2010–2022)"`
/// gives 2010/2022, `"(2013– )"` gives 2013/absent, and a value with no
/// parentheses gives absent/absent.
pub fn extract_year_ranges(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let years = string_values(&df, columns::YEAR)?;

    let (starts, ends): (Vec<Option<i64>>, Vec<Option<i64>>) = years
        .iter()
        .map(|value| parse_year_range(value.as_deref()))
        .unzip();

    let parsed = starts.iter().filter(|year| year.is_some()).count();
    debug!("Parsed start years for {}/{} rows", parsed, starts.len());

    df.with_column(Series::new(columns::START_YEAR.into(), starts))?;
    df.with_column(Series::new(columns::END_YEAR.into(), ends))?;
    df.drop_in_place(columns::YEAR)?;
    Ok(df)
}

pub(crate) fn parse_year_range(value: Option<&str>) -> (Option<i64>, Option<i64>) {
    let Some(inner) = value
        .and_then(|text| PARENTHESIZED.captures(text))
        .and_then(|captures| captures.get(1))
    else {
        return (None, None);
    };

    let mut parts = YEAR_SEPARATOR.split(inner.as_str());
    let start = parts
        .next()
        .and_then(|part| part.trim().parse::<i64>().ok());
    let end = parts.next().and_then(|part| {
        part.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .parse::<i64>()
            .ok()
    });
    (start, end)
}

/// Derive `director` and a cleaned `stars` list from the raw `stars` cell.
///
/// Whitespace runs collapse to one space first. A cell without a director
/// or without stars gets the `"Unknown"` sentinel for the missing part.
pub fn extract_director_and_stars(df: DataFrame) -> Result<DataFrame> {
    let mut df = collapse_column_whitespace(df, columns::STARS)?;
    let cells = string_values(&df, columns::STARS)?;

    let (directors, stars): (Vec<String>, Vec<String>) = cells
        .iter()
        .map(|cell| split_credits(cell.as_deref()))
        .unzip();

    let unknown = directors.iter().filter(|d| *d == UNKNOWN_SENTINEL).count();
    debug!("{} rows without a director", unknown);

    df.replace(columns::STARS, Series::new(columns::STARS.into(), stars))?;
    df.with_column(Series::new(columns::DIRECTOR.into(), directors))?;
    Ok(df)
}

pub(crate) fn split_credits(cell: Option<&str>) -> (String, String) {
    let cell = cell.unwrap_or_default();
    let director = capture_credit(&DIRECTOR, cell);
    let stars = capture_credit(&STARS, cell);
    (director, stars)
}

fn capture_credit(pattern: &Regex, cell: &str) -> String {
    pattern
        .captures(cell)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().trim())
        .filter(|found| !found.is_empty())
        .unwrap_or(UNKNOWN_SENTINEL)
        .to_string()
}
