//! Time related utils.

use crate::Error;
use chrono::NaiveDateTime;
use chrono::Utc;

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO8601: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse an ISO8601 basic timestamp: `20220313T072004Z`
pub fn parse_iso8601(s: &str) -> crate::Result<DateTime> {
    if s.len() != 16 || !s.is_ascii() {
        return Err(Error::signing_failed(format!(
            "timestamp {s:?} is not in the YYYYMMDDTHHMMSSZ format"
        )));
    }

    NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ")
        .map(|t| t.and_utc())
        .map_err(|e| {
            Error::signing_failed(format!("timestamp {s:?} is not a valid time")).with_source(e)
        })
}

/// Parse an RFC3339 timestamp such as `2022-03-13T07:20:04Z`.
pub fn parse_rfc3339(s: &str) -> crate::Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| Error::config_invalid(format!("parse {s:?} into rfc3339 failed")).with_source(e))
}
