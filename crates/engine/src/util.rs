//! Internal helpers for input parsing and normalization.
//!
//! These utilities are **not** part of the public API, except for
//! [`parse_day`] which clients use to interpret the listing date filter the
//! same way the engine does.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use unicode_normalization::UnicodeNormalization;

/// Folds a title into the form keyword search matches against.
pub(crate) fn normalize_title(value: &str) -> String {
    value.nfkc().collect::<String>().to_lowercase()
}

/// Trims text input and drops it when nothing is left.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Builds a `LIKE` pattern matching `needle` as a literal substring.
///
/// `\` is the escape character.
pub(crate) fn like_contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Parses the date of an expense.
///
/// Accepts an RFC 3339 timestamp, or a bare `YYYY-MM-DD` which is read as
/// midnight UTC of that day.
pub(crate) fn parse_expense_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
}

/// Parses the calendar day used to filter listings.
///
/// Returns `None` for anything that is not a date (including the literal
/// `"null"` some clients send), in which case no date filter is applied.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}
