//! Per-client aggregate state.

use ahash::AHashMap;

use crate::geo::GeoRecord;
use crate::ActionKind;

/// Aggregate record for one source address.
///
/// Created on the first CONNECT for the address and mutated for the lifetime
/// of the run. Invariants: `first_seen <= last_seen`, `connects >= 1`, and
/// `reconnect_delay` is assigned at most once.
#[derive(Debug, Clone)]
pub struct ClientState {
    /// Number of CONNECT events
    pub connects: u64,
    /// Unix timestamp of the first CONNECT
    pub first_seen: i64,
    /// Unix timestamp of the most recent CONNECT
    pub last_seen: i64,
    /// Graylist reconnection delay in seconds, set once when the client
    /// returns after a 450 soft rejection
    pub reconnect_delay: Option<i64>,
    /// Count per classified action
    pub actions: AHashMap<ActionKind, u64>,
    /// Blocklist rank values observed, in log order
    pub dnsbl_ranks: Vec<i32>,
    /// Geolocation, populated once on first sighting
    pub geo: Option<GeoRecord>,
}

impl ClientState {
    /// Create the state for a client's first CONNECT.
    pub fn first_connect(timestamp: i64) -> Self {
        Self {
            connects: 1,
            first_seen: timestamp,
            last_seen: timestamp,
            reconnect_delay: None,
            actions: AHashMap::new(),
            dnsbl_ranks: Vec::new(),
            geo: None,
        }
    }

    /// Record a repeat CONNECT.
    pub fn record_connect(&mut self, timestamp: i64) {
        self.last_seen = timestamp;
        self.connects += 1;
    }

    /// Increment the counter for an action.
    pub fn record_action(&mut self, kind: ActionKind) {
        *self.actions.entry(kind).or_insert(0) += 1;
    }

    /// Count for one action kind.
    pub fn action_count(&self, kind: ActionKind) -> u64 {
        self.actions.get(&kind).copied().unwrap_or(0)
    }

    /// Whether any punitive action was observed for this client.
    pub fn is_blocked(&self) -> bool {
        self.actions
            .iter()
            .any(|(kind, &count)| count > 0 && kind.is_punitive())
    }
}
