//! Connection I/O adapter
//!
//! Splits a bidirectional byte stream into a [`LineReader`] owned by the
//! session and an [`Outbox`] that anyone holding a clone can write through.
//!
//! ```text
//!   socket ──read half──► LineReader ──► session loop
//!
//!   router ──┐
//!   session ─┴─► Outbox ──mpsc──► writer task ──write half──► socket
//! ```

pub mod lines;
pub mod outbox;

pub use lines::LineReader;
pub use outbox::{spawn_writer, Outbox, OutboxError};
