//! Date helper functions

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a frontmatter date string in the common formats
pub fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // RFC 3339 keeps the wall-clock time of its own offset
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Format a frontmatter date for display (like "January 15, 2024")
///
/// Strings that are not recognizable dates are shown as written.
pub fn display_date(s: &str) -> String {
    match parse_date_string(s) {
        Some(dt) => dt.format("%B %d, %Y").to_string(),
        None => s.to_string(),
    }
}
