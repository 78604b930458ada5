//! HTTP date formatting
//!
//! RFC 1123 dates as used by `Expires` and `Last-Modified`, always in GMT.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeDelta, Utc};

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats a timestamp as an RFC 1123 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(RFC1123_FORMAT).to_string()
}

/// Formats a filesystem timestamp as an RFC 1123 date.
pub fn format_system_time(at: SystemTime) -> String {
    format_http_date(DateTime::<Utc>::from(at))
}

/// Returns `now + ttl`, saturating at the largest representable date.
pub fn expires_at(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
