//! Relay client implementation
//!
//! Provides the client side of the line protocol for:
//! - Publishing lines to a topic
//! - Subscribing to a topic and reading relayed lines

pub mod relay_client;

pub use relay_client::RelayClient;
