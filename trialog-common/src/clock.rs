//! Clock-string parsing for block times
//!
//! Block start/end values are free-text clock readings. They are parsed
//! leniently for duration math and otherwise displayed verbatim.

use chrono::NaiveTime;

/// Parse an operator-entered clock value (`HH:MM:SS` or `HH:MM`)
///
/// Returns None for anything unparseable; callers treat that as "no
/// duration available", never as an input error.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

/// Duration of a block in minutes, if both endpoints parse
pub fn duration_minutes(start: &str, end: &str) -> Option<f64> {
    let start = parse_clock(start)?;
    let end = parse_clock(end)?;
    Some((end - start).num_seconds() as f64 / 60.0)
}
