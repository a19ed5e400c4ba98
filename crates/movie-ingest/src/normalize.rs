//! Field normalization: pure conversions from raw cell values to typed values.
//!
//! Nothing in here returns an error. Malformed input degrades to `None` (or an
//! empty list), which keeps the repair stage free of per-cell failure handling.

/// Literal the repair stage writes when no director or stars could be extracted.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// Text form of an unparsed missing value that leaks out of spreadsheet exports.
pub const MISSING_MARKER: &str = "nan";

/// Delimiters accepted between values of a multi-value cell.
pub const MULTI_VALUE_DELIMITERS: [char; 3] = [';', '|', ','];

/// A raw cell value before coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(value: &'a str) -> Self {
        RawValue::Text(value)
    }
}

impl<'a> From<Option<&'a str>> for RawValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(RawValue::Missing, RawValue::Text)
    }
}

impl From<f64> for RawValue<'_> {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue<'_> {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

/// Coerce a raw value to a float.
///
/// Numbers pass through unchanged. Text keeps only ASCII digits, `.` and `-`
/// before parsing, so `"$1,234.5"` becomes `1234.5` and `"121 min"` becomes
/// `121.0`. Anything that does not parse afterwards is `None`.
///
/// # Example
///
/// ```rust,ignore
/// use movie_ingest::normalize::clean_numeric;
///
/// assert_eq!(clean_numeric("1,234"), Some(1234.0));
/// assert_eq!(clean_numeric("n/a"), None);
/// ```
pub fn clean_numeric<'a>(value: impl Into<RawValue<'a>>) -> Option<f64> {
    match value.into() {
        RawValue::Missing => None,
        RawValue::Number(n) if n.is_nan() => None,
        RawValue::Number(n) => Some(n),
        RawValue::Text(text) => {
            let digits: String = text
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if digits.is_empty() {
                return None;
            }
            digits.parse::<f64>().ok()
        }
    }
}

/// Coerce a raw value to an integer, truncating any fractional part.
pub fn clean_integer<'a>(value: impl Into<RawValue<'a>>) -> Option<i64> {
    clean_numeric(value)
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
}

/// Split a multi-value cell on `;`, `|` or `,`.
///
/// Pieces are trimmed and empty pieces dropped. Order is preserved and
/// duplicates are kept; deduplication belongs to the relationship linker.
pub fn split_multi_value<'a>(value: impl Into<Option<&'a str>>) -> Vec<String> {
    match value.into() {
        None => Vec::new(),
        Some(text) => text
            .split(MULTI_VALUE_DELIMITERS)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Whether a value is the textual `"nan"` artifact (case-insensitive).
pub fn is_missing_marker(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(MISSING_MARKER)
}

/// Whether a value is the `"Unknown"` sentinel (case-insensitive).
pub fn is_unknown_sentinel(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(UNKNOWN_SENTINEL)
}

/// Trim an entity name, rejecting empty names and `"nan"`.
pub fn normalize_entity_name(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() || is_missing_marker(trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// Collapse every run of whitespace (newlines included) to one space and trim.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
