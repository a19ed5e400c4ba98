use super::{columns, require_column, string_values};
use crate::error::Result;
use polars::prelude::*;
use tracing::debug;

/// Undo the votes/runtime/gross column shift.
///
/// Shifted rows carry `"<votes>,<runtime>"` in `votes`, their gross in
/// `runtime` and nothing useful in `gross`. After dropping everything but
/// digits and commas from `votes`, a value with exactly one comma is split:
/// the first part becomes votes, the second runtime, and the row's original
/// runtime moves to gross. Rows with zero or several commas (`"1,234,567"`)
/// are left untouched.
pub fn fix_column_shift(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    require_column(&df, columns::VOTES)?;
    require_column(&df, columns::RUNTIME)?;
    require_column(&df, columns::GROSS)?;

    let mut votes = string_values(&df, columns::VOTES)?;
    let mut runtime = string_values(&df, columns::RUNTIME)?;
    let mut gross = string_values(&df, columns::GROSS)?;

    let mut repaired = 0;
    for row in 0..votes.len() {
        let Some((true_votes, true_runtime)) = votes[row].as_deref().and_then(split_shifted_votes)
        else {
            continue;
        };

        gross[row] = runtime[row].take();
        runtime[row] = Some(true_runtime);
        votes[row] = Some(true_votes);
        repaired += 1;
    }

    if repaired > 0 {
        debug!("Repaired column shift in {} rows", repaired);
        df.replace(columns::VOTES, Series::new(columns::VOTES.into(), votes))?;
        df.replace(columns::RUNTIME, Series::new(columns::RUNTIME.into(), runtime))?;
        df.replace(columns::GROSS, Series::new(columns::GROSS.into(), gross))?;
    }

    Ok(df)
}

/// `Some((votes, runtime))` when the digits-and-commas form of `raw` has
/// exactly one comma.
pub(crate) fn split_shifted_votes(raw: &str) -> Option<(String, String)> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();

    let (first, second) = cleaned.split_once(',')?;
    if second.contains(',') {
        return None;
    }
    Some((first.to_string(), second.to_string()))
}
