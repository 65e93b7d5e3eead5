//! RFC 3339 timestamps with nanosecond precision.
//!
//! Expiration times are always rendered in UTC with the shortest exact
//! fractional second (trailing zeros trimmed, no fraction at all for whole
//! seconds), e.g. `2015-06-01T10:20:30.5Z`.

use chrono::{DateTime, Timelike, Utc};

/// Format an instant as an RFC 3339 UTC timestamp with trimmed nanoseconds.
pub fn format_rfc3339_nano(t: DateTime<Utc>) -> String {
    let mut out = t.format("%Y-%m-%dT%H:%M:%S").to_string();
    // chrono encodes a leap second as nanos >= 1e9.
    let nanos = t.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let frac = format!("{nanos:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push('Z');
    out
}

/// Parse an RFC 3339 timestamp with any offset, converting it to UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}
