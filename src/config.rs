//! Run configuration.

use std::path::PathBuf;

use chrono::{Datelike, Local};

use crate::timestamp::TimestampFormat;

/// Default mail log location.
pub const DEFAULT_LOG_FILE: &str = "/var/log/maillog";

/// Report flavor to render after aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Aggregate counters only
    Short,
    /// Per-client detail followed by aggregate counters
    Full,
    /// Per-client detail only
    IpDetail,
    /// Aggregate silently (map-only runs)
    None,
}

impl ReportMode {
    /// Parse a report mode from its CLI name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "short" => Some(ReportMode::Short),
            "full" => Some(ReportMode::Full),
            "ip" => Some(ReportMode::IpDetail),
            "none" => Some(ReportMode::None),
            _ => None,
        }
    }

    /// Whether per-client detail is printed.
    pub fn wants_detail(&self) -> bool {
        matches!(self, ReportMode::Full | ReportMode::IpDetail)
    }

    /// Whether the aggregate summary is computed.
    pub fn wants_summary(&self) -> bool {
        matches!(self, ReportMode::Short | ReportMode::Full | ReportMode::None)
    }

    /// Whether the aggregate summary is printed.
    pub fn prints_summary(&self) -> bool {
        matches!(self, ReportMode::Short | ReportMode::Full)
    }
}

/// Resolved configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mail log to parse; `.gz` files are decompressed transparently
    pub log_file: PathBuf,
    /// Action filter expression, e.g. `PREGREET&DNSBL|HANGUP`
    pub action_filter: Option<String>,
    /// Substring filter applied to raw lines, typically a single IP
    pub ip_filter: Option<String>,
    /// Report flavor
    pub report_mode: ReportMode,
    /// Year of the logs, for syslog timestamps that omit it
    pub year: i32,
    /// Timestamp format of the log lines
    pub format: TimestampFormat,
    /// GeoLite2 City database path; enables geolocation when set
    pub geofile: Option<PathBuf>,
    /// HTML map output path
    pub map_dest: Option<PathBuf>,
    /// Minimum connection count for a client to appear on the map
    pub map_min_conn: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            action_filter: None,
            ip_filter: None,
            report_mode: ReportMode::Short,
            year: Local::now().year(),
            format: TimestampFormat::Syslog,
            geofile: None,
            map_dest: None,
            map_min_conn: 0,
        }
    }
}
