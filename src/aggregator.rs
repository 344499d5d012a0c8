//! Per-client aggregation of the classified event stream.
//!
//! The log is read once, end to end, and folded sequentially into a map of
//! source address to [`ClientState`]. Postscreen logs CONNECT before any
//! other action for a client, so events arriving for an address with no
//! state are dropped rather than treated as errors.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashMap;
use flate2::read::GzDecoder;

use crate::classifier::LineClassifier;
use crate::client::ClientState;
use crate::config::Config;
use crate::error::Result;
use crate::event::{ClientAddr, Event};
use crate::geo::Locate;
use crate::ActionKind;

/// Completed aggregation state: one entry per distinct source address.
pub type ClientMap = AHashMap<ClientAddr, ClientState>;

/// Folds classified events into per-client state.
pub struct Aggregator {
    clients: ClientMap,
    classifier: LineClassifier,
    ip_filter: Option<String>,
    locator: Option<Box<dyn Locate>>,
}

impl Aggregator {
    /// Create an aggregator for the given run configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            clients: ClientMap::new(),
            classifier: LineClassifier::new(config.format, config.year),
            ip_filter: config.ip_filter.clone(),
            locator: None,
        }
    }

    /// Attach a geolocation collaborator. Each client is located once, on
    /// first sighting.
    pub fn with_locator(mut self, locator: Box<dyn Locate>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Ingest one classified event.
    pub fn ingest(&mut self, event: &Event) {
        if event.kind == ActionKind::Connect {
            self.ingest_connect(event);
            return;
        }

        let Some(state) = self.clients.get_mut(&event.source) else {
            log::debug!("dropping {} for unseen client {}", event.kind, event.source);
            return;
        };
        state.record_action(event.kind);

        match event.kind {
            ActionKind::PassOld => {
                // The client came back after a 450 soft rejection: the gap
                // between its two connects is the graylist reconnection
                // delay. Write-once.
                if state.connects == 2
                    && state.action_count(ActionKind::GraylistReconnectRejection) > 0
                    && state.reconnect_delay.is_none()
                {
                    state.reconnect_delay = Some(state.last_seen - state.first_seen);
                }
            }
            ActionKind::DnsblTriggered => {
                match event
                    .detail
                    .split_whitespace()
                    .nth(1)
                    .and_then(|t| t.parse::<i32>().ok())
                {
                    Some(rank) => state.dnsbl_ranks.push(rank),
                    None => log::debug!("unparseable DNSBL rank in {:?}", event.detail),
                }
            }
            _ => {}
        }
    }

    fn ingest_connect(&mut self, event: &Event) {
        match self.clients.get_mut(&event.source) {
            Some(state) => state.record_connect(event.timestamp),
            None => {
                let mut state = ClientState::first_connect(event.timestamp);
                if let (Some(locator), Some(ip)) = (self.locator.as_deref(), event.source.ip()) {
                    state.geo = locator.locate(ip);
                }
                self.clients.insert(event.source, state);
            }
        }
    }

    /// Classify and ingest one raw log line.
    ///
    /// Lines rejected by the IP substring filter or the classifier are
    /// skipped silently; timestamp failures abort the run.
    pub fn ingest_line(&mut self, line: &str) -> Result<bool> {
        if let Some(filter) = &self.ip_filter {
            if !line.contains(filter.as_str()) {
                return Ok(false);
            }
        }
        match self.classifier.classify(line)? {
            Some(event) => {
                self.ingest(&event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fold an entire line stream, returning the number of events ingested.
    pub fn consume<R: BufRead>(&mut self, reader: R) -> Result<u64> {
        let mut events = 0u64;
        for line in reader.lines() {
            if self.ingest_line(&line?)? {
                events += 1;
            }
        }
        log::info!(
            "classified {} postscreen events across {} clients",
            events,
            self.clients.len()
        );
        Ok(events)
    }

    /// Borrow the client map.
    pub fn clients(&self) -> &ClientMap {
        &self.clients
    }

    /// Consume the aggregator, yielding the completed client map.
    pub fn into_clients(self) -> ClientMap {
        self.clients
    }
}

/// Open a mail log for reading, decompressing `.gz` rotation artifacts
/// transparently.
pub fn open_log(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    log::info!("parsing {}", path.display());
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
