//! Client registry for topic routing
//!
//! The registry records every registered connection together with its role
//! and topic. Sessions insert themselves after registration and remove
//! themselves on exit; the router only ever reads snapshots.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<TopicRegistry>
//!                     ┌─────────────────────────┐
//!                     │ clients: HashMap<Id,    │
//!                     │   Client {              │
//!                     │     role, topic,        │
//!                     │     outbox: Outbox,     │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │ snapshot_matching()
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]            [Subscriber]            [Subscriber]
//!    read_line()            writer task             writer task
//!         │                       ▲                       ▲
//!         └──► router.route() ────┴── outbox.send() ──────┘
//! ```
//!
//! # Locking
//!
//! A single `parking_lot::Mutex` guards the table. It is held only for
//! in-memory bookkeeping; every socket write happens on a connection's own
//! writer task, after the snapshot has been taken and the lock released.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{Client, ClientFilter, ClientId};
pub use error::RegistryError;
pub use store::{ClientRegistry, TopicRegistry};
