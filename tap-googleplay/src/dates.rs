//! Timestamp parsing and formatting shared by config, checkpoints and shaping.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, TapError};

/// Bookmark format persisted in run state (second precision, UTC).
pub const BOOKMARK_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format used for `time_extracted` and coerced `date-time` fields.
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Parses a cursor or start date into a UTC instant.
///
/// Accepts RFC 3339 with any offset, `YYYY-MM-DDTHH:MM:SS` with or without a
/// trailing `Z`, and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = trimmed.trim_end_matches('Z');
    if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&parsed));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    Err(TapError::InvalidTimestamp {
        value: value.to_string(),
        message: "expected an ISO-8601 timestamp such as 2019-06-01T00:00:00Z".to_string(),
    })
}

/// Formats an instant as a run-state bookmark.
pub fn format_bookmark(instant: &DateTime<Utc>) -> String {
    instant.format(BOOKMARK_DATE_FORMAT).to_string()
}

/// Formats an instant the way records carry timestamps.
pub fn format_record_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(RECORD_DATE_FORMAT).to_string()
}

/// Year-month stamp used in report object keys, e.g. `201906`.
pub fn year_month(instant: &DateTime<Utc>) -> String {
    instant.format("%Y%m").to_string()
}
