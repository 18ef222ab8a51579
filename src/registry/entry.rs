//! Client records and snapshot filters
//!
//! This module defines the per-connection state stored in the registry.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::connection::Outbox;
use crate::protocol::Role;

/// Registry-assigned client identifier
pub type ClientId = u32;

/// A registered connection
///
/// Cloning is cheap: the outbox is a channel handle, so a clone taken for a
/// snapshot writes to the same connection as the registry's own copy.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique among currently registered clients
    pub id: ClientId,

    /// Publisher or subscriber, fixed at registration
    pub role: Role,

    /// Routing key, fixed at registration
    pub topic: String,

    /// Remote peer address (informational)
    pub peer_addr: SocketAddr,

    /// When registration completed
    pub registered_at: Instant,

    outbox: Outbox,
}

impl Client {
    pub(super) fn new(
        id: ClientId,
        outbox: Outbox,
        role: Role,
        topic: String,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            id,
            role,
            topic,
            peer_addr,
            registered_at: Instant::now(),
            outbox,
        }
    }

    /// Handle for writing to this client's connection
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Time since registration
    pub fn connected_for(&self) -> Duration {
        self.registered_at.elapsed()
    }
}

/// Predicate over clients, used to take registry snapshots
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    pub role: Option<Role>,
    pub topic: Option<String>,
    pub exclude: Option<ClientId>,
}

impl ClientFilter {
    /// Matches every client
    pub fn all() -> Self {
        Self::default()
    }

    /// Subscribers on exactly `topic`
    pub fn subscribers_of(topic: impl Into<String>) -> Self {
        Self::all().role(Role::Subscriber).topic(topic)
    }

    /// Restrict to a role
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Restrict to an exact topic
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Leave out one client
    pub fn excluding(mut self, id: ClientId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Check a client against the filter
    pub fn matches(&self, client: &Client) -> bool {
        self.role.map_or(true, |role| client.role == role)
            && self.topic.as_deref().map_or(true, |t| client.topic == t)
            && self.exclude != Some(client.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::DEFAULT_OUTBOX_CAPACITY;
    use std::net::{IpAddr, Ipv4Addr};

    fn client(id: ClientId, role: Role, topic: &str) -> Client {
        let (outbox, _rx) = Outbox::bounded(DEFAULT_OUTBOX_CAPACITY);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000 + id as u16);
        Client::new(id, outbox, role, topic.to_string(), addr)
    }

    #[test]
    fn test_all_matches_everything() {
        let filter = ClientFilter::all();
        assert!(filter.matches(&client(1, Role::Publisher, "a")));
        assert!(filter.matches(&client(2, Role::Subscriber, "")));
    }

    #[test]
    fn test_subscribers_of_topic() {
        let filter = ClientFilter::subscribers_of("weather");
        assert!(filter.matches(&client(1, Role::Subscriber, "weather")));
        assert!(!filter.matches(&client(2, Role::Publisher, "weather")));
        assert!(!filter.matches(&client(3, Role::Subscriber, "sports")));
        assert!(!filter.matches(&client(4, Role::Subscriber, "Weather")));
    }

    #[test]
    fn test_excluding_sender() {
        let filter = ClientFilter::subscribers_of("weather").excluding(7);
        assert!(!filter.matches(&client(7, Role::Subscriber, "weather")));
        assert!(filter.matches(&client(8, Role::Subscriber, "weather")));
    }

    #[test]
    fn test_empty_topic_matches_empty_topic() {
        let filter = ClientFilter::subscribers_of("");
        assert!(filter.matches(&client(1, Role::Subscriber, "")));
        assert!(!filter.matches(&client(2, Role::Subscriber, "x")));
    }
}
