//! Timestamp formats used on the wire.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format of every timestamp the service returns and accepts as a filter.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format of the `completed_on` value written when a task is marked complete.
pub const COMPLETED_ON_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a wire timestamp. Anything that does not match [`WIRE_FORMAT`]
/// exactly yields `None`.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, WIRE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for a request body or a `range_start`/`range_end` filter.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(WIRE_FORMAT).to_string()
}

/// Format the completion time sent with a completed task.
pub fn format_completed_on(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(COMPLETED_ON_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn parses_wire_format() {
        let parsed = parse_timestamp("2008-03-14T09:26:53Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2008, 3, 14, 9, 26, 53).unwrap());
    }

    #[test]
    fn rejects_other_formats() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("2008-03-14 09:26:53").is_none());
        assert!(parse_timestamp("2008-03-14T09:26:53+01:00").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn formats_filter_and_completion_values() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-02T03:04:05Z");
        assert_eq!(format_completed_on(&ts), "2024-01-02 03:04:05");
    }
}
