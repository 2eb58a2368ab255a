// Utility functions
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

/// Format the gateway writes timestamps in.
pub const RESPONSE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ISO-8601 without fractional seconds, as sent in `date_from`/`date_to`.
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses a response timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, RESPONSE_TIME_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, REQUEST_TIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_request_time(dt: &NaiveDateTime) -> String {
    dt.format(REQUEST_TIME_FORMAT).to_string()
}

/// Drops sub-second precision.
pub fn truncate_to_second(dt: DateTime<Utc>) -> NaiveDateTime {
    let naive = dt.naive_utc();
    naive.with_nanosecond(0).unwrap_or(naive)
}

/// "kalman" -> "Kalman".
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
