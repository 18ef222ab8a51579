//! Error types
//!
//! Failures here are always recovered locally by the session that hit them.
//! Peers never see an application-level error code, only a closed connection.

use std::io;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer closed the connection before a full exchange completed
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Malformed registration line
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Registry refused the operation
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Registration line could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// No `:` between role and topic
    #[error("expected ROLE:TOPIC, no separator found")]
    MissingSeparator,

    /// Role token is neither `PUBLISHER` nor `SUBSCRIBER`
    #[error("unknown role: {0:?}")]
    UnknownRole(String),
}

impl Error {
    /// Whether this error means the peer simply went away
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::ConnectionClosed => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
