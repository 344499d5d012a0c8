//! postscreen-stats - a Postfix postscreen log analyzer.
//!
//! This crate parses the postscreen lines of a mail log and computes
//! per-client behavioral statistics: connection counts, filtering actions
//! triggered, reconnection delays after graylist soft-rejections, and DNSBL
//! trigger severity.
//!
//! # Features
//!
//! - **Line classification**: every postscreen log line becomes a typed
//!   [`Event`] with a closed [`ActionKind`] vocabulary
//! - **Per-client aggregation**: one [`ClientState`] per source IP, folded
//!   in a single pass over the log
//! - **Action filters**: `PREGREET&DNSBL|HANGUP` expressions select which
//!   clients contribute to the aggregate report
//! - **Geolocation**: optional MaxMind GeoLite2 lookups through the
//!   [`Locate`] trait
//! - **Reports**: short/full/per-IP text reports and an HTML map of blocked
//!   clients
//!
//! # Quick Start
//!
//! ```ignore
//! use postscreen_stats::{
//!     open_log, summarize, ActionFilter, Aggregator, Config,
//! };
//!
//! let config = Config::default();
//! let mut aggregator = Aggregator::new(&config);
//! aggregator.consume(open_log(&config.log_file)?)?;
//!
//! let filter = ActionFilter::compile(config.action_filter.as_deref());
//! let summary = summarize(aggregator.clients(), &filter);
//! println!("{} clients, {} blocked", summary.clients, summary.blocked_clients);
//! ```

mod action;
mod error;
mod event;

pub mod aggregator;
pub mod classifier;
pub mod client;
pub mod config;
pub mod filter;
pub mod geo;
pub mod htmlmap;
pub mod report;
pub mod summary;
pub mod timestamp;

// Re-export core types
pub use action::ActionKind;
pub use error::{Error, Result};
pub use event::{ClientAddr, Event, UNKNOWN_ADDR};

// Re-export the pipeline surface
pub use aggregator::{open_log, Aggregator, ClientMap};
pub use classifier::{LineClassifier, POSTSCREEN_MARKER};
pub use client::ClientState;
pub use config::{Config, ReportMode, DEFAULT_LOG_FILE};
pub use filter::ActionFilter;
pub use geo::{GeoRecord, Locate, MaxMindLocator};
pub use summary::{delay_bucket, summarize, ActionTally, Summary};
pub use timestamp::{TimestampFormat, TimestampParser};
