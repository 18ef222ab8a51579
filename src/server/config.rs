//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::*;
use crate::session::SessionLimits;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Registration topics are truncated to this many bytes
    pub max_topic_len: usize,

    /// Longest line relayed in one piece
    pub max_line_len: usize,

    /// Frames queued per connection before deliveries to it are dropped
    pub outbox_capacity: usize,

    /// Periodic stats logging interval (`None` disables it)
    pub stats_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: DEFAULT_MAX_CLIENTS,
            tcp_nodelay: true, // Lines are small and latency matters
            max_topic_len: DEFAULT_MAX_TOPIC_LEN,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            stats_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the topic length limit
    pub fn max_topic_len(mut self, len: usize) -> Self {
        self.max_topic_len = len;
        self
    }

    /// Set the line length limit (at least one byte)
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len.max(1);
        self
    }

    /// Set the per-connection outbox capacity (at least one frame)
    pub fn outbox_capacity(mut self, frames: usize) -> Self {
        self.outbox_capacity = frames.max(1);
        self
    }

    /// Set the stats interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = Some(interval);
        self
    }

    /// Turn off periodic stats logging
    pub fn disable_stats(mut self) -> Self {
        self.stats_interval = None;
        self
    }

    /// Limits handed to each session
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_topic_len: self.max_topic_len,
            max_line_len: self.max_line_len,
            outbox_capacity: self.outbox_capacity,
        }
    }
}
