//! Text cell conventions shared by every table adapter.
//!
//! Cells are stored as text; these helpers are the only place that decides
//! what counts as a number, a boolean or a timestamp.

use chrono::{DateTime, SecondsFormat, Utc};

pub const TRUE: &str = "TRUE";
pub const FALSE: &str = "FALSE";

/// Parse a numeric cell. Empty, non-numeric and non-finite values are `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a boolean cell (`TRUE`, `true`, `yes`, `1`); anything else is false.
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

pub fn format_bool(value: bool) -> &'static str {
    if value { TRUE } else { FALSE }
}

/// Render a number the way a spreadsheet would: integral values without a
/// fractional part, others rounded to nine decimals so binary noise such as
/// `0.19999999999999998` reads `0.2`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{value:.9}");
    if !fixed.contains('.') {
        return fixed;
    }
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" { "0".to_string() } else { trimmed.to_string() }
}

/// RFC 3339 UTC, second precision.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
