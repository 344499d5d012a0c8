//! Log timestamp parsing.
//!
//! Syslog timestamps (`Oct 23 04:02:17`) omit the year, so it must be
//! supplied externally; RFC3339 timestamps are self-contained. A timestamp
//! that resolves to a point after process start is rejected, since that
//! almost always means the configured year is wrong.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::error::{Error, Result};

/// Timestamp flavor found at the start of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Three-token syslog prefix, e.g. `Oct 23 04:02:17`
    Syslog,
    /// Single-token RFC3339 prefix, e.g. `2012-04-13T08:53:00+02:00`
    Rfc3339,
}

impl TimestampFormat {
    /// Field index of the action token for this format (timestamp fields +
    /// hostname + process tag come first).
    pub fn cursor(&self) -> usize {
        match self {
            TimestampFormat::Syslog => 5,
            TimestampFormat::Rfc3339 => 3,
        }
    }

    /// Number of leading fields holding the timestamp itself.
    pub fn timestamp_fields(&self) -> usize {
        match self {
            TimestampFormat::Syslog => 3,
            TimestampFormat::Rfc3339 => 1,
        }
    }
}

/// Converts a line's timestamp prefix into unix seconds.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    format: TimestampFormat,
    year: i32,
    /// Reference point for the future-timestamp guard.
    now: i64,
}

impl TimestampParser {
    /// Create a parser anchored at the current time.
    pub fn new(format: TimestampFormat, year: i32) -> Self {
        Self {
            format,
            year,
            now: Local::now().timestamp(),
        }
    }

    /// Override the reference point used by the future guard.
    #[cfg(test)]
    pub fn with_reference(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// Parse a raw timestamp prefix into unix seconds.
    ///
    /// For syslog input `raw` is the three timestamp tokens rejoined with
    /// single spaces; for RFC3339 it is the first token verbatim.
    pub fn parse(&self, raw: &str) -> Result<i64> {
        let ts = match self.format {
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .map_err(|e| Error::Timestamp {
                    raw: raw.to_string(),
                    reason: e.to_string(),
                })?
                .timestamp(),
            TimestampFormat::Syslog => {
                let dated = format!("{} {}", self.year, raw);
                let naive = NaiveDateTime::parse_from_str(&dated, "%Y %b %d %H:%M:%S").map_err(
                    |e| Error::Timestamp {
                        raw: raw.to_string(),
                        reason: e.to_string(),
                    },
                )?;
                Local
                    .from_local_datetime(&naive)
                    .earliest()
                    .ok_or_else(|| Error::Timestamp {
                        raw: raw.to_string(),
                        reason: "nonexistent local time".to_string(),
                    })?
                    .timestamp()
            }
        };

        if ts > self.now {
            return Err(Error::FutureTimestamp {
                raw: raw.to_string(),
                year: self.year,
            });
        }
        Ok(ts)
    }
}
