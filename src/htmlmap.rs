//! HTML map output.
//!
//! Renders blocked, geolocated clients as Google Maps markers with an info
//! window per client carrying its aggregate record.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{Local, TimeZone};

use crate::aggregator::ClientMap;
use crate::error::Result;
use crate::summary::Summary;

const MAP_HEADER: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Postscreen GeoMap of Blocked IPs</title>
    <script type="text/javascript"
        src="https://maps.google.com/maps/api/js?sensor=false"></script>
    <script type="text/javascript">
    var ip = new Array();
    var marker_ip = new Array();
    var desc_ip = new Array();
    var info_window = new Array();

        window.onload = function() {
            var center = new google.maps.LatLng(0,0);
            var mapOptions = {
                zoom: 2,
                center: center,
                mapTypeId: google.maps.MapTypeId.TERRAIN
            };
            var myMap = new google.maps.Map(
                document.getElementById('map'),mapOptions
            );
"#;

const MAP_STYLE_AND_BODY: &str = r#"        }
    </script>
    <style type="text/css">
        #map {
            width:100%;
            height:800px;
        }
    </style>
  </head>
  <body>
    <h1>Postscreen Map of Blocked IPs</h1>
    <div id="map"></div>
"#;

/// Escape a string for embedding in a single-quoted JS literal.
fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace("</", "<\\/")
}

fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Write the map HTML for every blocked client with plottable coordinates
/// and at least `min_conn` connections. Returns the number of markers.
pub fn write_map<W: Write>(
    out: &mut W,
    clients: &ClientMap,
    summary: &Summary,
    min_conn: u64,
) -> io::Result<u64> {
    out.write_all(MAP_HEADER.as_bytes())?;

    let mut addrs = summary.blocked_addrs.clone();
    addrs.sort();

    let mut markers = 0u64;
    for addr in addrs {
        let Some(state) = clients.get(&addr) else {
            continue;
        };
        if state.connects < min_conn {
            continue;
        }
        let Some(geo) = state.geo.as_ref().filter(|g| g.has_coordinates()) else {
            continue;
        };
        let (lat, lon) = (geo.latitude.unwrap_or(0.0), geo.longitude.unwrap_or(0.0));

        writeln!(
            out,
            "        ip[{i}] = new google.maps.LatLng({lat},{lon});",
            i = markers
        )?;
        writeln!(
            out,
            "        marker_ip[{i}] = new google.maps.Marker({{\n\
             \x20           position: ip[{i}], map: myMap, title: \"{addr}\"}});",
            i = markers
        )?;

        let mut body = String::new();
        body.push_str(&format!("<p>CONNECT: {}</p>", state.connects));
        body.push_str(&format!(
            "<p>FIRST SEEN: {}</p>",
            format_timestamp(state.first_seen)
        ));
        body.push_str(&format!(
            "<p>LAST SEEN: {}</p>",
            format_timestamp(state.last_seen)
        ));
        if let Some(delay) = state.reconnect_delay {
            body.push_str(&format!("<p>RECO. DELAY (graylist): {}</p>", delay));
        }
        let mut actions: Vec<_> = state
            .actions
            .iter()
            .filter(|(_, &count)| count > 0)
            .collect();
        actions.sort_by_key(|(kind, _)| kind.as_str());
        for (kind, count) in actions {
            body.push_str(&format!("<p>{}: {}</p>", kind, count));
        }
        if !state.dnsbl_ranks.is_empty() {
            body.push_str(&format!("<p>DNSBL ranks: {:?}</p>", state.dnsbl_ranks));
        }
        if let Some(city) = &geo.city {
            body.push_str(&format!(
                "<p>Location: {}, {}</p>",
                js_escape(city),
                js_escape(geo.country_code.as_deref().unwrap_or("-")),
            ));
        }

        writeln!(
            out,
            "        desc_ip[{i}] = '<div id=\"content\"><h2>{addr}</h2>{body}</div>';",
            i = markers
        )?;
        writeln!(
            out,
            "        info_window[{i}] = new google.maps.InfoWindow({{\n\
             \x20       content: desc_ip[{i}], maxWidth: 500}});\n\
             \x20       google.maps.event.addListener(marker_ip[{i}], 'click', function() {{\n\
             \x20           info_window[{i}].open(myMap, marker_ip[{i}]);\n\
             \x20       }});",
            i = markers
        )?;
        markers += 1;
    }

    out.write_all(MAP_STYLE_AND_BODY.as_bytes())?;
    writeln!(out, "    <p>mapping {} blocked IPs</p>", markers)?;
    writeln!(out, "  </body>\n</html>")?;
    Ok(markers)
}

/// Render the map to a file.
pub fn render_map_file(
    path: &Path,
    clients: &ClientMap,
    summary: &Summary,
    min_conn: u64,
) -> Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let markers = write_map(&mut out, clients, summary, min_conn)?;
    out.flush()?;
    log::info!("created HTML map with {} markers at {}", markers, path.display());
    Ok(markers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientState;
    use crate::event::ClientAddr;
    use crate::filter::ActionFilter;
    use crate::geo::GeoRecord;
    use crate::summary::summarize;
    use crate::ActionKind;
    use std::net::Ipv4Addr;

    fn blocked_client(connects: u64, with_coords: bool) -> ClientState {
        let mut state = ClientState::first_connect(1_600_000_000);
        for _ in 1..connects {
            state.record_connect(1_600_000_100);
        }
        state.record_action(ActionKind::DnsblTriggered);
        state.dnsbl_ranks.push(4);
        state.geo = Some(GeoRecord {
            country_name: Some("France".to_string()),
            country_code: Some("FR".to_string()),
            city: Some("Paris".to_string()),
            latitude: with_coords.then_some(48.85),
            longitude: with_coords.then_some(2.35),
        });
        state
    }

    fn render(clients: &ClientMap, min_conn: u64) -> (String, u64) {
        let summary = summarize(clients, &ActionFilter::pass_all());
        let mut buf = Vec::new();
        let markers = write_map(&mut buf, clients, &summary, min_conn).unwrap();
        (String::from_utf8(buf).unwrap(), markers)
    }

    #[test]
    fn test_marker_per_blocked_client() {
        let mut clients = ClientMap::new();
        clients.insert(
            ClientAddr::Ip(Ipv4Addr::new(192, 0, 2, 1)),
            blocked_client(1, true),
        );
        let (html, markers) = render(&clients, 0);
        assert_eq!(markers, 1);
        assert!(html.contains("new google.maps.LatLng(48.85,2.35)"));
        assert!(html.contains("title: \"192.0.2.1\""));
        assert!(html.contains("DNSBL: 1"));
        assert!(html.contains("Location: Paris, FR"));
        assert!(html.contains("mapping 1 blocked IPs"));
    }

    #[test]
    fn test_min_conn_threshold() {
        let mut clients = ClientMap::new();
        clients.insert(
            ClientAddr::Ip(Ipv4Addr::new(192, 0, 2, 1)),
            blocked_client(1, true),
        );
        clients.insert(
            ClientAddr::Ip(Ipv4Addr::new(192, 0, 2, 2)),
            blocked_client(3, true),
        );
        let (html, markers) = render(&clients, 2);
        assert_eq!(markers, 1);
        assert!(html.contains("192.0.2.2"));
        assert!(!html.contains("title: \"192.0.2.1\""));
    }

    #[test]
    fn test_client_without_coordinates_skipped() {
        let mut clients = ClientMap::new();
        clients.insert(
            ClientAddr::Ip(Ipv4Addr::new(192, 0, 2, 1)),
            blocked_client(1, false),
        );
        let (html, markers) = render(&clients, 0);
        assert_eq!(markers, 0);
        assert!(html.contains("mapping 0 blocked IPs"));
    }

    #[test]
    fn test_js_escape() {
        assert_eq!(js_escape("it's"), "it\\'s");
        assert_eq!(js_escape("</script>"), "<\\/script>");
        assert_eq!(js_escape("a\\b"), "a\\\\b");
    }
}
