//! Postscreen action classifications.

use std::fmt;

/// ActionKind is the closed set of postscreen classifications a log line can
/// carry.
///
/// Canonical names follow the vocabulary postscreen writes to the mail log,
/// so reports and action-filter expressions read the same as the raw logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// New client connection
    Connect,
    /// Client passed, seen before (cached decision)
    PassOld,
    /// Client passed all tests for the first time
    PassNew,
    /// Rejected: per-client connection limit reached
    TooManyConnections,
    /// Rejected: all server ports busy
    ServerPortsBusy,
    /// Soft-rejected with 450 during deep protocol tests (graylisting)
    GraylistReconnectRejection,
    /// Client hung up before greeting
    Hangup,
    /// Client listed on one or more DNS blocklists
    DnsblTriggered,
    /// Client spoke before the server greeting
    Pregreet,
    /// Command pipelining detected
    CommandPipelining,
    /// Command time limit exceeded
    CommandTimeLimit,
    /// Command count limit exceeded
    CommandCountLimit,
    /// Command length limit exceeded
    CommandLengthLimit,
    /// Client on the permanent whitelist
    Whitelisted,
    /// Client on the permanent blacklist
    Blacklisted,
    /// Bare newline in SMTP stream
    BareNewline,
    /// Non-SMTP command received
    NonSmtpCommand,
    /// Whitelist decision vetoed
    WhitelistVeto,
}

impl ActionKind {
    /// All kinds, in report display order.
    pub const ALL: [ActionKind; 18] = [
        ActionKind::Connect,
        ActionKind::PassOld,
        ActionKind::PassNew,
        ActionKind::TooManyConnections,
        ActionKind::ServerPortsBusy,
        ActionKind::GraylistReconnectRejection,
        ActionKind::Hangup,
        ActionKind::DnsblTriggered,
        ActionKind::Pregreet,
        ActionKind::CommandPipelining,
        ActionKind::CommandTimeLimit,
        ActionKind::CommandCountLimit,
        ActionKind::CommandLengthLimit,
        ActionKind::Whitelisted,
        ActionKind::Blacklisted,
        ActionKind::BareNewline,
        ActionKind::NonSmtpCommand,
        ActionKind::WhitelistVeto,
    ];

    /// Get the canonical name, as written in the legacy reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Connect => "CONNECT",
            ActionKind::PassOld => "PASS OLD",
            ActionKind::PassNew => "PASS NEW",
            ActionKind::TooManyConnections => "NOQUEUE too many connections",
            ActionKind::ServerPortsBusy => "NOQUEUE all server ports busy",
            ActionKind::GraylistReconnectRejection => {
                "NOQUEUE 450 deep protocol test reconnection"
            }
            ActionKind::Hangup => "HANGUP",
            ActionKind::DnsblTriggered => "DNSBL",
            ActionKind::Pregreet => "PREGREET",
            ActionKind::CommandPipelining => "COMMAND PIPELINING",
            ActionKind::CommandTimeLimit => "COMMAND TIME LIMIT",
            ActionKind::CommandCountLimit => "COMMAND COUNT LIMIT",
            ActionKind::CommandLengthLimit => "COMMAND LENGTH LIMIT",
            ActionKind::Whitelisted => "WHITELISTED",
            ActionKind::Blacklisted => "BLACKLISTED",
            ActionKind::BareNewline => "BARE NEWLINE",
            ActionKind::NonSmtpCommand => "NON-SMTP COMMAND",
            ActionKind::WhitelistVeto => "WHITELIST VETO",
        }
    }

    /// Whether this classification counts as a block for country-level
    /// accounting.
    pub fn is_punitive(&self) -> bool {
        matches!(
            self,
            ActionKind::Blacklisted
                | ActionKind::DnsblTriggered
                | ActionKind::Pregreet
                | ActionKind::CommandPipelining
                | ActionKind::CommandTimeLimit
                | ActionKind::CommandCountLimit
                | ActionKind::CommandLengthLimit
                | ActionKind::BareNewline
                | ActionKind::NonSmtpCommand
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
