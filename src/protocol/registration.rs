//! Registration handshake
//!
//! Parses the `ROLE:TOPIC` line a client sends first. Only the first colon
//! separates; the topic may contain further colons and is truncated to a
//! fixed byte length.

use std::fmt;
use std::str::FromStr;

use tokio::io::AsyncRead;

use crate::connection::LineReader;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::{
    PUBLISHER_TOKEN, REGISTRATION_SEPARATOR, SUBSCRIBER_TOKEN, TERMINATE_SENTINEL,
};
use crate::registry::ClientId;

/// Fixed capability of a client for the lifetime of its connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Source of broadcast messages
    Publisher,
    /// Sink for broadcast messages
    Subscriber,
}

impl Role {
    /// Wire token for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publisher => PUBLISHER_TOKEN,
            Role::Subscriber => SUBSCRIBER_TOKEN,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    /// Exact, case-sensitive match against the two role tokens
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            PUBLISHER_TOKEN => Ok(Role::Publisher),
            SUBSCRIBER_TOKEN => Ok(Role::Subscriber),
            other => Err(ProtocolError::UnknownRole(other.to_string())),
        }
    }
}

/// A parsed registration line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub role: Role,
    pub topic: String,
}

/// Parse a registration line
///
/// Trailing `\r`/`\n` are stripped before parsing. An empty topic is valid.
pub fn parse_registration(
    line: &str,
    max_topic_len: usize,
) -> std::result::Result<Registration, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (role, topic) = line
        .split_once(REGISTRATION_SEPARATOR)
        .ok_or(ProtocolError::MissingSeparator)?;

    Ok(Registration {
        role: role.parse()?,
        topic: truncate_topic(topic, max_topic_len).to_string(),
    })
}

/// Read and parse the first line of a connection
///
/// Returns `Error::ConnectionClosed` if the peer disconnects before sending
/// a single byte.
pub async fn read_registration<R>(
    reader: &mut LineReader<R>,
    max_topic_len: usize,
) -> Result<Registration>
where
    R: AsyncRead + Unpin,
{
    match reader.read_line().await? {
        Some(line) => Ok(parse_registration(&line, max_topic_len)?),
        None => Err(Error::ConnectionClosed),
    }
}

/// Whether a line ends the session
pub fn is_terminate(line: &str) -> bool {
    line.starts_with(TERMINATE_SENTINEL)
}

/// Line a client sends to register
pub fn registration_line(role: Role, topic: &str) -> String {
    format!("{}{}{}\n", role, REGISTRATION_SEPARATOR, topic)
}

/// Advisory reply sent after a successful registration
pub fn confirmation_line(id: ClientId, registration: &Registration) -> String {
    format!(
        "Registered as {} on topic '{}' with id {}\n",
        registration.role, registration.topic, id
    )
}

// Cut at the last char boundary at or below `max` bytes.
fn truncate_topic(topic: &str, max: usize) -> &str {
    if topic.len() <= max {
        return topic;
    }
    let mut end = max;
    while !topic.is_char_boundary(end) {
        end -= 1;
    }
    &topic[..end]
}
