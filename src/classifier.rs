//! Log line classification.
//!
//! Only lines carrying the postscreen subsystem marker are considered. The
//! line is split into leading whitespace fields (timestamp + hostname +
//! process tag), then the action token at the format's cursor position is
//! dispatched through a fixed table, with sub-pattern matching on the raw
//! remainder. Sub-patterns per token are mutually exclusive; the first match
//! wins.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::event::{ClientAddr, Event};
use crate::timestamp::{TimestampFormat, TimestampParser};
use crate::ActionKind;

/// Marker identifying postscreen lines in a mail log.
pub const POSTSCREEN_MARKER: &str = "/postscreen[";

/// Dotted-quad IPv4 literal with valid octet ranges.
static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
    )
    .expect("valid IPv4 regex")
});

/// Parses raw postscreen log lines into typed [`Event`]s.
pub struct LineClassifier {
    format: TimestampFormat,
    stamp: TimestampParser,
}

impl LineClassifier {
    /// Create a classifier for the given timestamp format.
    ///
    /// `year` dates syslog-style timestamps, which omit it.
    pub fn new(format: TimestampFormat, year: i32) -> Self {
        Self {
            format,
            stamp: TimestampParser::new(format, year),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_parser(format: TimestampFormat, stamp: TimestampParser) -> Self {
        Self { format, stamp }
    }

    /// Classify one raw log line.
    ///
    /// Returns `Ok(None)` for lines without the postscreen marker, with too
    /// few fields, or with an unrecognized action token. Returns an error
    /// only when a recognized line carries an unparseable or future-dated
    /// timestamp.
    pub fn classify(&self, line: &str) -> Result<Option<Event>> {
        if !line.contains(POSTSCREEN_MARKER) {
            return Ok(None);
        }

        let (token, remainder) = match field_at(line, self.format.cursor()) {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let kind = match resolve_kind(token, remainder) {
            Some(kind) => kind,
            None => return Ok(None),
        };

        let source = match IPV4_RE.find(remainder) {
            Some(m) => m
                .as_str()
                .parse::<Ipv4Addr>()
                .map(ClientAddr::Ip)
                .unwrap_or(ClientAddr::Unknown),
            None => ClientAddr::Unknown,
        };

        let raw_ts: Vec<&str> = line
            .split_whitespace()
            .take(self.format.timestamp_fields())
            .collect();
        let timestamp = self.stamp.parse(&raw_ts.join(" "))?;

        Ok(Some(Event {
            timestamp,
            source,
            kind,
            detail: remainder.to_string(),
        }))
    }
}

/// Resolve the action kind from the cursor token and the raw remainder.
fn resolve_kind(token: &str, remainder: &str) -> Option<ActionKind> {
    match token {
        "CONNECT" => Some(ActionKind::Connect),
        "PASS" => {
            if remainder.starts_with("OLD") {
                Some(ActionKind::PassOld)
            } else if remainder.starts_with("NEW") {
                Some(ActionKind::PassNew)
            } else {
                None
            }
        }
        "NOQUEUE:" => {
            if remainder.contains("too many connections") {
                Some(ActionKind::TooManyConnections)
            } else if remainder.contains("all server ports busy") {
                Some(ActionKind::ServerPortsBusy)
            } else if remainder.contains("450 4.3.2 Service currently unavailable") {
                Some(ActionKind::GraylistReconnectRejection)
            } else {
                None
            }
        }
        "HANGUP" => Some(ActionKind::Hangup),
        "DNSBL" => Some(ActionKind::DnsblTriggered),
        "PREGREET" => Some(ActionKind::Pregreet),
        "COMMAND" => {
            if remainder.starts_with("PIPELINING") {
                Some(ActionKind::CommandPipelining)
            } else if remainder.starts_with("TIME LIMIT") {
                Some(ActionKind::CommandTimeLimit)
            } else if remainder.starts_with("COUNT LIMIT") {
                Some(ActionKind::CommandCountLimit)
            } else if remainder.starts_with("LENGTH LIMIT") {
                Some(ActionKind::CommandLengthLimit)
            } else {
                None
            }
        }
        "WHITELISTED" => Some(ActionKind::Whitelisted),
        "BLACKLISTED" => Some(ActionKind::Blacklisted),
        "BARE" => remainder
            .starts_with("NEWLINE")
            .then_some(ActionKind::BareNewline),
        "NON-SMTP" => remainder
            .starts_with("COMMAND")
            .then_some(ActionKind::NonSmtpCommand),
        "WHITELIST" => remainder
            .starts_with("VETO")
            .then_some(ActionKind::WhitelistVeto),
        _ => None,
    }
}

/// Return the whitespace-separated field at `idx` together with the raw text
/// following it (leading whitespace trimmed), or `None` if the line has too
/// few fields.
fn field_at(line: &str, idx: usize) -> Option<(&str, &str)> {
    let mut rest = line.trim_start();
    if rest.is_empty() {
        return None;
    }
    for _ in 0..idx {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
        if rest.is_empty() {
            return None;
        }
    }
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some((&rest[..end], rest[end..].trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syslog() -> LineClassifier {
        LineClassifier::new(TimestampFormat::Syslog, 2020)
    }

    fn classify_kind(line: &str) -> Option<ActionKind> {
        syslog().classify(line).unwrap().map(|e| e.kind)
    }

    #[test]
    fn test_connect() {
        let event = syslog()
            .classify(
                "Oct 23 04:02:17 mx1 postfix/postscreen[14317]: \
                 CONNECT from [192.0.2.7]:33911 to [198.51.100.2]:25",
            )
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, ActionKind::Connect);
        assert_eq!(event.source.to_string(), "192.0.2.7");
        assert!(event.detail.starts_with("from [192.0.2.7]"));
    }

    #[test]
    fn test_pass_variants() {
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: PASS OLD [192.0.2.7]:33911"
            ),
            Some(ActionKind::PassOld)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: PASS NEW [192.0.2.7]:33911"
            ),
            Some(ActionKind::PassNew)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: PASS WEIRD [192.0.2.7]:33911"
            ),
            None
        );
    }

    #[test]
    fn test_noqueue_variants() {
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: NOQUEUE: reject: \
                 CONNECT from [192.0.2.7]:33911: too many connections"
            ),
            Some(ActionKind::TooManyConnections)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: NOQUEUE: \
                 all server ports busy"
            ),
            Some(ActionKind::ServerPortsBusy)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: NOQUEUE: reject: \
                 RCPT from [192.0.2.7]:33911: 450 4.3.2 Service currently unavailable; \
                 proto=SMTP helo=<example>"
            ),
            Some(ActionKind::GraylistReconnectRejection)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: NOQUEUE: reject: \
                 RCPT from [192.0.2.7]:33911: 550 5.5.1 Blocked"
            ),
            None
        );
    }

    #[test]
    fn test_dnsbl_carries_rank_detail() {
        let event = syslog()
            .classify(
                "Oct 23 04:03:12 mx1 postfix/postscreen[14317]: \
                 DNSBL rank 5 for [192.0.2.7]:33911",
            )
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, ActionKind::DnsblTriggered);
        assert_eq!(event.detail.split_whitespace().nth(1), Some("5"));
    }

    #[test]
    fn test_command_limits() {
        let cases = [
            ("PIPELINING", ActionKind::CommandPipelining),
            ("TIME LIMIT", ActionKind::CommandTimeLimit),
            ("COUNT LIMIT", ActionKind::CommandCountLimit),
            ("LENGTH LIMIT", ActionKind::CommandLengthLimit),
        ];
        for (sub, kind) in cases {
            let line = format!(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 COMMAND {} from [192.0.2.7]:33911",
                sub
            );
            assert_eq!(classify_kind(&line), Some(kind), "{}", sub);
        }
    }

    #[test]
    fn test_list_kinds() {
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: WHITELISTED [192.0.2.7]:33911"
            ),
            Some(ActionKind::Whitelisted)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: BLACKLISTED [192.0.2.7]:33911"
            ),
            Some(ActionKind::Blacklisted)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 BARE NEWLINE from [192.0.2.7]:33911"
            ),
            Some(ActionKind::BareNewline)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 NON-SMTP COMMAND from [192.0.2.7]:33911 after RCPT: GET / HTTP/1.1"
            ),
            Some(ActionKind::NonSmtpCommand)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 WHITELIST VETO [192.0.2.7]:33911"
            ),
            Some(ActionKind::WhitelistVeto)
        );
    }

    #[test]
    fn test_hangup_and_pregreet() {
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 HANGUP after 1.9 from [192.0.2.7]:33911 in tests after SMTP handshake"
            ),
            Some(ActionKind::Hangup)
        );
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 PREGREET 11 after 0.15 from [192.0.2.7]:33911: EHLO spam\\r\\n"
            ),
            Some(ActionKind::Pregreet)
        );
    }

    #[test]
    fn test_non_postscreen_line_skipped() {
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/smtpd[2210]: connect from example[192.0.2.7]"
            ),
            None
        );
    }

    #[test]
    fn test_unrecognized_token_skipped() {
        assert_eq!(
            classify_kind(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: cache btree:/var/lib/postfix full"
            ),
            None
        );
    }

    #[test]
    fn test_truncated_line_skipped() {
        assert_eq!(
            classify_kind("Oct 23 04:05:01 mx1 postfix/postscreen[14317]:"),
            None
        );
    }

    #[test]
    fn test_missing_ip_yields_sentinel() {
        let event = syslog()
            .classify(
                "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: \
                 CONNECT from unknown client",
            )
            .unwrap()
            .unwrap();
        assert_eq!(event.source, ClientAddr::Unknown);
        assert_eq!(event.source.to_string(), "999.999.999.999");
    }

    #[test]
    fn test_rfc3339_cursor() {
        let classifier = LineClassifier::new(TimestampFormat::Rfc3339, 2020);
        let event = classifier
            .classify(
                "2020-04-13T08:53:00+02:00 mx1 postfix/postscreen[14317]: \
                 CONNECT from [192.0.2.7]:33911 to [198.51.100.2]:25",
            )
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, ActionKind::Connect);
        assert_eq!(event.source.to_string(), "192.0.2.7");
    }

    #[test]
    fn test_future_timestamp_is_fatal() {
        let stamp = TimestampParser::new(TimestampFormat::Syslog, 2020).with_reference(0);
        let classifier = LineClassifier::with_parser(TimestampFormat::Syslog, stamp);
        let result = classifier.classify(
            "Oct 23 04:05:01 mx1 postfix/postscreen[14317]: CONNECT from [192.0.2.7]:33911",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_field_at() {
        assert_eq!(field_at("a b  c", 0), Some(("a", "b  c")));
        assert_eq!(field_at("a b  c", 1), Some(("b", "c")));
        assert_eq!(field_at("a b  c", 2), Some(("c", "")));
        assert_eq!(field_at("a b  c", 3), None);
        assert_eq!(field_at("", 0), None);
    }
}
