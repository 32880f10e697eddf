use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Milliseconds in one day; end dates of a filter are padded by this much.
pub const DAY_MILLIS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{0}'")]
pub struct InvalidDate(pub String);

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Shifts client-local datetimes into absolute server time.
///
/// Offsets follow the "minutes behind UTC" convention (UTC+1 is `-60`).
/// A local string is first read as server-local time and then moved by
/// `server_offset - client_offset` minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneShift {
    pub server_offset_minutes: i32,
    pub client_offset_minutes: i32,
}

impl TimeZoneShift {
    pub fn new(server_offset_minutes: i32, client_offset_minutes: i32) -> Self {
        Self {
            server_offset_minutes,
            client_offset_minutes,
        }
    }

    /// Parse a client datetime. Strings carrying their own offset are taken as-is.
    pub fn to_server_instant(&self, raw: &str) -> Result<DateTime<Utc>, InvalidDate> {
        let raw = raw.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Ok(instant.with_timezone(&Utc));
        }

        let invalid = || InvalidDate(raw.to_string());
        let local = parse_naive(raw).ok_or_else(invalid)?;
        let diff = i64::from(self.server_offset_minutes) - i64::from(self.client_offset_minutes);
        local
            .and_utc()
            .checked_add_signed(Duration::minutes(i64::from(self.server_offset_minutes)))
            .and_then(|t| t.checked_sub_signed(Duration::minutes(diff)))
            .ok_or_else(invalid)
    }
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Start of a filter day: `YYYY-MM-DD` is UTC midnight, RFC 3339 is taken as-is.
pub fn parse_day_start(raw: &str) -> Result<DateTime<Utc>, InvalidDate> {
    TimeZoneShift::new(0, 0).to_server_instant(raw)
}
