//! TCP front end
//!
//! Binds the listener, admits connections up to the configured limit and
//! spawns a session task for each.

pub mod config;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;
