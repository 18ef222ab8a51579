//! Relay statistics
//!
//! Counts of clients per topic, logged whenever the registry changes and on
//! a fixed interval.

pub mod metrics;

pub use metrics::{log_stats, spawn_stats_task, RelayStats, TopicStats};
