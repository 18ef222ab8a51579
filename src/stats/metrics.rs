//! Per-topic client counts

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::registry::ClientRegistry;

/// Client counts for one topic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicStats {
    /// Topic name (may be empty)
    pub topic: String,
    /// Registered publishers
    pub publishers: usize,
    /// Registered subscribers
    pub subscribers: usize,
}

impl TopicStats {
    pub fn new(topic: String) -> Self {
        Self {
            topic,
            publishers: 0,
            subscribers: 0,
        }
    }

    /// Publishers plus subscribers
    pub fn total(&self) -> usize {
        self.publishers + self.subscribers
    }
}

/// Relay-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Registered clients across all topics
    pub total_clients: usize,
    /// Topics in use, sorted by name
    pub topics: Vec<TopicStats>,
}

impl RelayStats {
    /// Stats for a single topic, if anyone is registered on it
    pub fn topic(&self, topic: &str) -> Option<&TopicStats> {
        self.topics.iter().find(|t| t.topic == topic)
    }
}

impl fmt::Display for RelayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} clients", self.total_clients)?;
        for t in &self.topics {
            write!(
                f,
                "; '{}': {} publishers, {} subscribers",
                t.topic, t.publishers, t.subscribers
            )?;
        }
        Ok(())
    }
}

/// Emit the registry's current statistics at info level
pub fn log_stats<R>(registry: &R)
where
    R: ClientRegistry + ?Sized,
{
    let stats = registry.stats();
    tracing::info!(
        total_clients = stats.total_clients,
        topics = stats.topics.len(),
        "Relay stats: {}",
        stats
    );
}

/// Periodically log registry statistics
///
/// The first report is emitted one full `interval` after spawning. Abort the
/// returned handle to stop reporting.
pub fn spawn_stats_task<R>(registry: Arc<R>, interval: Duration) -> JoinHandle<()>
where
    R: ClientRegistry + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            log_stats(&*registry);
        }
    })
}
