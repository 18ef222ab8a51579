//! Registry configuration

use crate::protocol::constants::DEFAULT_MAX_CLIENTS;

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum concurrently registered clients (0 = unbounded)
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl RegistryConfig {
    /// Set the capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Remove the capacity limit
    pub fn unbounded(self) -> Self {
        self.capacity(0)
    }

    /// Whether `count` registered clients fill the registry
    pub fn is_full(&self, count: usize) -> bool {
        self.capacity > 0 && count >= self.capacity
    }
}
