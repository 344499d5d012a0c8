//! Text report rendering.
//!
//! Pure presentation over the aggregated data: nothing here mutates state or
//! computes new metrics beyond percentages.

use std::io::{self, Write};

use chrono::{Local, TimeZone};

use crate::aggregator::ClientMap;
use crate::event::ClientAddr;
use crate::summary::{Summary, DELAY_BUCKET_LABELS};

/// Countries shown in the blocked-clients section.
const TOP_COUNTRIES: usize = 20;

/// Format a unix timestamp for display in the local timezone.
fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Write the per-client detail dump (`full` and `ip` report modes).
pub fn write_client_details<W: Write>(out: &mut W, clients: &ClientMap) -> io::Result<()> {
    let mut addrs: Vec<&ClientAddr> = clients.keys().collect();
    addrs.sort();

    for addr in addrs {
        let state = &clients[addr];
        writeln!(out, "{}", addr)?;
        writeln!(out, "\t CONNECT : {}", state.connects)?;
        writeln!(out, "\t FIRST SEEN : {}", format_timestamp(state.first_seen))?;
        writeln!(out, "\t LAST SEEN : {}", format_timestamp(state.last_seen))?;
        if let Some(delay) = state.reconnect_delay {
            writeln!(out, "\t RECO. DELAY (graylist) : {}", delay)?;
        }
        writeln!(out, "\t--- postscreen actions ---")?;

        let mut actions: Vec<_> = state
            .actions
            .iter()
            .filter(|(_, &count)| count > 0)
            .collect();
        actions.sort_by_key(|(kind, _)| kind.as_str());
        for (kind, count) in actions {
            writeln!(out, "\t {} : {}", kind, count)?;
            if kind == &crate::ActionKind::DnsblTriggered {
                writeln!(out, "\tDNSBL ranks: {:?}", state.dnsbl_ranks)?;
            }
        }

        if let Some(geo) = &state.geo {
            writeln!(
                out,
                "\tGeoLoc: {}, {}",
                geo.country_name.as_deref().unwrap_or("-"),
                geo.city.as_deref().unwrap_or("-"),
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Write the aggregate summary (`short` and `full` report modes).
pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out, "\n=== unique clients/total postscreen actions ===")?;
    writeln!(
        out,
        "{}/{} CONNECT",
        summary.connect.clients, summary.connect.occurrences
    )?;
    let mut actions: Vec<_> = summary.actions.iter().collect();
    actions.sort_by_key(|(kind, _)| kind.as_str());
    for (kind, tally) in actions {
        writeln!(out, "{}/{} {}", tally.clients, tally.occurrences, kind)?;
    }

    writeln!(out, "\n=== clients statistics ===")?;
    writeln!(out, "{} clients", summary.clients)?;
    writeln!(out, "{} blocked clients", summary.blocked_clients)?;
    writeln!(out, "{} reconnections", summary.reconnections)?;
    writeln!(
        out,
        "{:.2} seconds avg. reco. delay",
        summary.avg_reconnect_delay
    )?;
    writeln!(out, "{:.2} avg. dnsbl rank", summary.avg_dnsbl_rank)?;

    if summary.reconnections > 0 {
        writeln!(out, "\n=== First reconnection delay (graylist) ===")?;
        writeln!(out, "{:<16} | {:>7} | {:>7}", "delay", "count", "pct %")?;
        for (label, &count) in DELAY_BUCKET_LABELS.iter().zip(&summary.delay_histogram) {
            let pct = count as f64 / summary.reconnections as f64 * 100.0;
            writeln!(out, "{:<16} | {:>7} | {:>6.2}%", label, count, pct)?;
        }
    }

    if summary.blocked_clients > 0 {
        writeln!(out, "\n=== Top {} Countries of Blocked Clients ===", TOP_COUNTRIES)?;
        for (country, count) in summary.top_blocked_countries().into_iter().take(TOP_COUNTRIES) {
            let pct = count as f64 / summary.blocked_clients as f64 * 100.0;
            writeln!(out, "{:>4} ({:5.2}%) {}", count, pct, country)?;
        }
    }
    Ok(())
}
