//! Topic-scoped publish/subscribe relay over line-oriented TCP
//!
//! Clients connect, send one `ROLE:TOPIC` registration line, and from then on
//! every line a publisher sends is relayed to the subscribers registered on
//! the same topic.
//!
//! ```text
//!   TcpListener ──accept──► RelayServer ──spawn──► run_session ─┐
//!                                                               │
//!             TopicRegistry ◄── insert / remove ────────────────┤
//!                   │                                           │
//!                   └── snapshot ──► Router ◄── publisher line ─┘
//!                                      │
//!                                      └──► subscriber outboxes
//! ```
//!
//! # Example
//! ```no_run
//! use topic_relay::server::{RelayServer, ServerConfig};
//!
//! # async fn example() -> topic_relay::error::Result<()> {
//! let config = ServerConfig::with_addr("0.0.0.0:5000".parse().unwrap());
//! RelayServer::new(config).run().await
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{Registration, Role};
pub use registry::{ClientId, ClientRegistry, TopicRegistry};
pub use router::{RouteReport, Router};
pub use server::{RelayServer, ServerConfig};
