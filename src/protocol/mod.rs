//! Line protocol
//!
//! The first line on a connection registers it:
//!
//! ```text
//! PUBLISHER:weather\n      or      SUBSCRIBER:weather\n
//! ```
//!
//! Every later line is either a message (publishers) or ignored (subscribers),
//! unless it starts with `terminate`, which ends the session.

pub mod constants;
pub mod registration;

pub use registration::{
    confirmation_line, is_terminate, parse_registration, read_registration, registration_line,
    Registration, Role,
};
