//! Aggregate reduction of the completed client map.

use ahash::AHashMap;

use crate::aggregator::ClientMap;
use crate::event::ClientAddr;
use crate::filter::ActionFilter;
use crate::ActionKind;

/// Labels for the reconnection-delay histogram buckets, in bucket order.
pub const DELAY_BUCKET_LABELS: [&str; 10] = [
    "<10s",
    "10s to 30s",
    ">30s to 1min",
    ">1min to 5min",
    ">5min to 30min",
    ">30min to 2h",
    ">2h to 5h",
    ">5h to 12h",
    ">12h to 24h",
    ">24h",
];

/// Upper bounds (inclusive) of buckets 1..=8, in seconds.
const DELAY_BUCKET_BOUNDS: [i64; 8] = [30, 60, 300, 1800, 7200, 18000, 43200, 86400];

/// Assign a reconnection delay to its histogram bucket.
///
/// The first two buckets are asymmetric: `[0,10)` then `[10,30]` inclusive
/// on both ends; every later bucket is `(lo,hi]`.
pub fn delay_bucket(delay: i64) -> usize {
    if delay < 10 {
        return 0;
    }
    for (i, bound) in DELAY_BUCKET_BOUNDS.iter().enumerate() {
        if delay <= *bound {
            return i + 1;
        }
    }
    9
}

/// Per-action accounting: distinct clients and total occurrences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionTally {
    /// Distinct clients with at least one occurrence
    pub clients: u64,
    /// Total occurrences across those clients
    pub occurrences: u64,
}

/// Aggregate counters over the filtered client population.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Clients passing the action filter
    pub clients: u64,
    /// Distinct connecting clients and total CONNECT count
    pub connect: ActionTally,
    /// Per-action tallies
    pub actions: AHashMap<ActionKind, ActionTally>,
    /// Clients with a recorded graylist reconnection delay
    pub reconnections: u64,
    /// Mean reconnection delay in seconds, 0 when none were recorded
    pub avg_reconnect_delay: f64,
    /// Reconnection delay histogram, indexed per [`DELAY_BUCKET_LABELS`]
    pub delay_histogram: [u64; 10],
    /// Mean DNSBL rank over DNSBL-triggering clients, 0 when none triggered
    pub avg_dnsbl_rank: f64,
    /// Geolocated clients with at least one punitive action
    pub blocked_clients: u64,
    /// Blocked-client tallies keyed by country name
    pub blocked_countries: AHashMap<String, u64>,
    /// Addresses of blocked clients, for map rendering
    pub blocked_addrs: Vec<ClientAddr>,
}

impl Summary {
    /// Blocked-country tallies sorted by count, highest first.
    pub fn top_blocked_countries(&self) -> Vec<(&str, u64)> {
        let mut countries: Vec<(&str, u64)> = self
            .blocked_countries
            .iter()
            .map(|(name, &count)| (name.as_str(), count))
            .collect();
        countries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        countries
    }
}

/// Reduce the completed client map into aggregate counters, considering only
/// clients the action filter accepts.
pub fn summarize(clients: &ClientMap, filter: &ActionFilter) -> Summary {
    let mut summary = Summary::default();
    let mut delay_sum = 0i64;
    let mut rank_sum = 0i64;
    let mut dnsbl_clients = 0u64;

    for (addr, state) in clients {
        if !filter.matches(&state.actions) {
            continue;
        }
        summary.clients += 1;
        summary.connect.clients += 1;
        summary.connect.occurrences += state.connects;

        for (kind, &count) in &state.actions {
            if count == 0 {
                continue;
            }
            let tally = summary.actions.entry(*kind).or_default();
            tally.clients += 1;
            tally.occurrences += count;
        }

        if let Some(delay) = state.reconnect_delay {
            summary.reconnections += 1;
            delay_sum += delay;
            summary.delay_histogram[delay_bucket(delay)] += 1;
        }

        if state.action_count(ActionKind::DnsblTriggered) > 0 {
            dnsbl_clients += 1;
            rank_sum += state.dnsbl_ranks.iter().map(|&r| i64::from(r)).sum::<i64>();
        }

        if let Some(geo) = &state.geo {
            if state.is_blocked() {
                summary.blocked_clients += 1;
                summary.blocked_addrs.push(*addr);
                if let Some(country) = &geo.country_name {
                    *summary.blocked_countries.entry(country.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    if summary.reconnections > 0 {
        summary.avg_reconnect_delay = delay_sum as f64 / summary.reconnections as f64;
    }
    if dnsbl_clients > 0 {
        summary.avg_dnsbl_rank = rank_sum as f64 / dnsbl_clients as f64;
    }
    summary
}
