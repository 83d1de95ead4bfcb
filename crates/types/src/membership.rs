//! Ensemble membership documents.
//!
//! The coordination service publishes its live membership at
//! [`MEMBERSHIP_PATH`] as newline-delimited records:
//!
//! ```text
//! server.1=10.0.0.1:2888:3888:participant;10.0.0.1:2181
//! server.2=10.0.0.2:2888:3888:observer;10.0.0.2:2181
//! version=100000000
//! ```
//!
//! [`MembershipDocument::parse`] turns that text into a structured document,
//! and [`MembershipDocument::client_addrs`] derives the addresses clients
//! should be routed to.

use std::{fmt, str::FromStr};

use snafu::{ResultExt, ensure};

use crate::error::{
    FieldCountSnafu, InvalidNumberSnafu, InvalidUtf8Snafu, InvalidVersionSnafu, ParseError, Result,
    UnknownRoleSnafu, UnknownServerRole,
};

/// Well-known node holding the ensemble's membership document.
pub const MEMBERSHIP_PATH: &str = "/zookeeper/config";

const VERSION_PREFIX: &str = "version=";
const SERVER_PREFIX: &str = "server.";

/// Number of fields in a normalized `server.` record.
const SERVER_FIELDS: usize = 7;

/// Voting status of an ensemble member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    /// Votes and may become leader.
    Participant,
    /// Receives state but does not vote.
    Observer,
}

impl ServerRole {
    /// Returns the role's name as written in membership documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Observer => "observer",
        }
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerRole {
    type Err = UnknownServerRole;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "participant" => Ok(Self::Participant),
            "observer" => Ok(Self::Observer),
            other => Err(UnknownServerRole { role: other.to_owned() }),
        }
    }
}

/// One ensemble member's peer-protocol and client-facing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerEntry {
    /// Server id (`server.<id>`).
    pub id: u64,
    /// Host used for the peer protocol.
    pub host: String,
    /// Quorum peer port.
    pub peer_port: u16,
    /// Leader election port.
    pub election_port: u16,
    /// Voting status.
    pub role: ServerRole,
    /// Host clients connect to.
    pub client_host: String,
    /// Port clients connect to.
    pub client_port: u16,
}

impl ServerEntry {
    /// Returns the client-facing address as `host:port`.
    #[must_use]
    pub fn client_addr(&self) -> String {
        format!("{}:{}", self.client_host, self.client_port)
    }

    /// Returns whether this member votes.
    #[must_use]
    pub fn is_participant(&self) -> bool {
        self.role == ServerRole::Participant
    }
}

impl fmt::Display for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SERVER_PREFIX}{}={}:{}:{}:{};{}:{}",
            self.id,
            self.host,
            self.peer_port,
            self.election_port,
            self.role,
            self.client_host,
            self.client_port
        )
    }
}

/// A parsed membership document.
///
/// Only ever produced whole: [`parse`](Self::parse) either returns a fully
/// valid document or an error, never a partially populated one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDocument {
    /// Configuration version (written in hex).
    pub version: i64,
    /// Members in document order.
    pub servers: Vec<ServerEntry>,
}

impl MembershipDocument {
    /// Parses a raw membership document.
    ///
    /// Records are classified by prefix:
    /// - `version=<hex>` sets [`version`](Self::version); the last one wins.
    /// - `server.<id>=<host>:<peer>:<election>:<role>;<client host>:<client port>` adds a member.
    /// - Anything else, blank lines included, is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the line number and text of the first
    /// malformed record.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut document = Self::default();

        for (index, raw) in data.split(|&byte| byte == b'\n').enumerate() {
            let line = index + 1;
            if !raw.starts_with(VERSION_PREFIX.as_bytes()) && !raw.starts_with(SERVER_PREFIX.as_bytes())
            {
                continue;
            }

            let text = std::str::from_utf8(raw).with_context(|_| InvalidUtf8Snafu {
                line,
                text: String::from_utf8_lossy(raw),
                bytes: raw,
            })?;

            if let Some(version) = text.strip_prefix(VERSION_PREFIX) {
                document.version =
                    i64::from_str_radix(version, 16).context(InvalidVersionSnafu { line, text })?;
            } else if let Some(record) = text.strip_prefix(SERVER_PREFIX) {
                document.servers.push(parse_server(line, text, record)?);
            }
        }

        Ok(document)
    }

    /// Returns the client addresses of participants, in document order.
    ///
    /// Observers are left out: clients are only routed to voting members.
    #[must_use]
    pub fn client_addrs(&self) -> Vec<String> {
        self.participants().map(ServerEntry::client_addr).collect()
    }

    /// Iterates over the voting members.
    pub fn participants(&self) -> impl Iterator<Item = &ServerEntry> {
        self.servers.iter().filter(|server| server.is_participant())
    }
}

impl FromStr for MembershipDocument {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Display for MembershipDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for server in &self.servers {
            writeln!(f, "{server}")?;
        }
        if self.version < 0 {
            writeln!(f, "{VERSION_PREFIX}-{:x}", self.version.unsigned_abs())
        } else {
            writeln!(f, "{VERSION_PREFIX}{:x}", self.version)
        }
    }
}

fn parse_server(line: usize, text: &str, record: &str) -> Result<ServerEntry> {
    let normalized: String =
        record.chars().map(|c| if matches!(c, '=' | ':' | ';') { ' ' } else { c }).collect();
    let fields: Vec<&str> = normalized.split_whitespace().collect();

    ensure!(fields.len() == SERVER_FIELDS, FieldCountSnafu { line, text, found: fields.len() });

    let role = fields[4]
        .parse::<ServerRole>()
        .map_err(|err| UnknownRoleSnafu { line, text, role: err.role }.build())?;

    Ok(ServerEntry {
        id: parse_number(line, text, "id", fields[0])?,
        host: fields[1].to_owned(),
        peer_port: parse_number(line, text, "peer port", fields[2])?,
        election_port: parse_number(line, text, "election port", fields[3])?,
        role,
        client_host: fields[5].to_owned(),
        client_port: parse_number(line, text, "client port", fields[6])?,
    })
}

fn parse_number<T>(line: usize, text: &str, field: &'static str, value: &str) -> Result<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    value.parse::<T>().context(InvalidNumberSnafu { line, text, field, value })
}
