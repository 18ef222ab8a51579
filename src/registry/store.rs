//! Client registry implementation
//!
//! The registry is the only shared mutable state in the relay and the sole
//! source of truth for which clients are connected.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::net::SocketAddr;

use parking_lot::Mutex;

use super::config::RegistryConfig;
use super::entry::{Client, ClientId};
use super::error::RegistryError;
use crate::connection::Outbox;
use crate::protocol::Role;
use crate::stats::{RelayStats, TopicStats};

/// Table of registered clients
///
/// Implementations must run every operation under one mutual-exclusion
/// discipline and must never hold it across I/O.
pub trait ClientRegistry: Send + Sync {
    /// Register a client and assign it an id
    fn insert(
        &self,
        outbox: Outbox,
        role: Role,
        topic: String,
        peer_addr: SocketAddr,
    ) -> Result<ClientId, RegistryError>;

    /// Remove a client, closing its connection
    ///
    /// Returns `false` if `id` was not registered. Calling this twice for the
    /// same client is harmless.
    fn remove(&self, id: ClientId) -> bool;

    /// Point-in-time copy of every client matching `predicate`
    fn snapshot_matching(&self, predicate: &dyn Fn(&Client) -> bool) -> Vec<Client>;

    /// Number of registered clients
    fn count(&self) -> usize;

    /// Distinct topics with at least one registered client, sorted
    fn topics_in_use(&self) -> Vec<String>;

    /// Number of clients with the given role on the given topic
    fn count_by_role_and_topic(&self, role: Role, topic: &str) -> usize;

    /// Look up a single client
    fn get(&self, id: ClientId) -> Option<Client> {
        self.snapshot_matching(&|client| client.id == id)
            .into_iter()
            .next()
    }

    /// Per-topic publisher and subscriber counts
    ///
    /// The default implementation combines several queries and so is not
    /// taken at a single instant.
    fn stats(&self) -> RelayStats {
        let topics = self
            .topics_in_use()
            .into_iter()
            .map(|topic| TopicStats {
                publishers: self.count_by_role_and_topic(Role::Publisher, &topic),
                subscribers: self.count_by_role_and_topic(Role::Subscriber, &topic),
                topic,
            })
            .collect();

        RelayStats {
            total_clients: self.count(),
            topics,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    clients: HashMap<ClientId, Client>,
    /// Ids freed by `remove`, smallest first
    released: BinaryHeap<Reverse<ClientId>>,
    next_id: ClientId,
}

impl Table {
    fn allocate_id(&mut self) -> ClientId {
        if let Some(Reverse(id)) = self.released.pop() {
            return id;
        }
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded `HashMap` registry
///
/// Ids start at 1. A freed id is handed out again, lowest first, but only
/// after the `remove` that freed it has finished.
#[derive(Debug)]
pub struct TopicRegistry {
    table: Mutex<Table>,
    config: RegistryConfig,
}

impl TopicRegistry {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry for TopicRegistry {
    fn insert(
        &self,
        outbox: Outbox,
        role: Role,
        topic: String,
        peer_addr: SocketAddr,
    ) -> Result<ClientId, RegistryError> {
        let mut table = self.table.lock();

        if self.config.is_full(table.clients.len()) {
            return Err(RegistryError::CapacityExceeded {
                capacity: self.config.capacity,
            });
        }

        let id = table.allocate_id();
        let client = Client::new(id, outbox, role, topic, peer_addr);
        table.clients.insert(id, client);

        Ok(id)
    }

    fn remove(&self, id: ClientId) -> bool {
        let removed = {
            let mut table = self.table.lock();
            let removed = table.clients.remove(&id);
            if removed.is_some() {
                table.released.push(Reverse(id));
            }
            removed
        };

        // Dropped outside the lock; this releases the registry's outbox handle.
        match removed {
            Some(client) => {
                tracing::debug!(
                    client_id = id,
                    peer = %client.peer_addr,
                    topic = %client.topic,
                    connected_ms = client.connected_for().as_millis() as u64,
                    "Client removed from registry"
                );
                true
            }
            None => false,
        }
    }

    fn snapshot_matching(&self, predicate: &dyn Fn(&Client) -> bool) -> Vec<Client> {
        let table = self.table.lock();
        table
            .clients
            .values()
            .filter(|client| predicate(client))
            .cloned()
            .collect()
    }

    fn count(&self) -> usize {
        self.table.lock().clients.len()
    }

    fn topics_in_use(&self) -> Vec<String> {
        let table = self.table.lock();
        let topics: BTreeSet<&str> = table.clients.values().map(|c| c.topic.as_str()).collect();
        topics.into_iter().map(str::to_string).collect()
    }

    fn count_by_role_and_topic(&self, role: Role, topic: &str) -> usize {
        let table = self.table.lock();
        table
            .clients
            .values()
            .filter(|c| c.role == role && c.topic == topic)
            .count()
    }

    fn get(&self, id: ClientId) -> Option<Client> {
        self.table.lock().clients.get(&id).cloned()
    }

    fn stats(&self) -> RelayStats {
        let table = self.table.lock();
        let mut per_topic: HashMap<&str, TopicStats> = HashMap::new();

        for client in table.clients.values() {
            let entry = per_topic
                .entry(client.topic.as_str())
                .or_insert_with(|| TopicStats::new(client.topic.clone()));
            match client.role {
                Role::Publisher => entry.publishers += 1,
                Role::Subscriber => entry.subscribers += 1,
            }
        }

        let mut topics: Vec<TopicStats> = per_topic.into_values().collect();
        topics.sort_by(|a, b| a.topic.cmp(&b.topic));

        RelayStats {
            total_clients: table.clients.len(),
            topics,
        }
    }
}
