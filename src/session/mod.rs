//! Per-connection session
//!
//! A session owns one accepted connection from the first byte to close:
//!
//! ```text
//!   Connected ──► Registering ──► Active ──► Terminated
//!                      │                        ▲
//!                      └── bad line / EOF / full┘
//! ```
//!
//! Everything a session learns about itself is recorded in [`SessionState`],
//! which [`run_session`] hands back once the connection is closed.

pub mod handler;
pub mod state;

pub use handler::{run_session, SessionLimits};
pub use state::{SessionPhase, SessionState, TerminationReason};
