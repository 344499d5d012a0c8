//! Error types for postscreen-stats.

use thiserror::Error;

/// Error type for postscreen-stats operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparseable timestamp prefix
    #[error("invalid timestamp {raw:?}: {reason}")]
    Timestamp { raw: String, reason: String },

    /// Timestamp resolved to a point after process start
    #[error(
        "timestamp {raw:?} is in the future; are you really parsing mail logs from year {year}?"
    )]
    FutureTimestamp { raw: String, year: i32 },

    /// GeoIP database error
    #[error("GeoIP error: {0}")]
    GeoIp(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for postscreen-stats operations.
pub type Result<T> = std::result::Result<T, Error>;
