//! Session state machine
//!
//! Tracks a relay session from accept to termination.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use crate::protocol::Registration;
use crate::registry::ClientId;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP accepted, nothing read yet
    Connected,
    /// Waiting for the registration line
    Registering,
    /// Registered; relaying lines
    Active,
    /// Session over; final
    Terminated,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Peer closed its side of the connection
    PeerClosed,
    /// Reading from the peer failed
    ReadError,
    /// Client sent the termination sentinel
    Sentinel,
    /// Malformed registration line
    ProtocolError,
    /// Peer went away before sending a registration line
    ClosedDuringRegistration,
    /// Registry had no free slot
    CapacityExceeded,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::PeerClosed => "peer closed",
            TerminationReason::ReadError => "read error",
            TerminationReason::Sentinel => "terminated by client",
            TerminationReason::ProtocolError => "protocol error",
            TerminationReason::ClosedDuringRegistration => "closed during registration",
            TerminationReason::CapacityExceeded => "capacity exceeded",
        };
        f.write_str(s)
    }
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Time when registration completed
    pub registered_at: Option<Instant>,

    /// Registry id, once registered
    pub client_id: Option<ClientId>,

    /// Role and topic, once registered
    pub registration: Option<Registration>,

    /// Lines read after registration (sentinel included)
    pub lines_received: u64,

    /// Publisher lines handed to the router
    pub messages_routed: u64,

    /// Set on entering `Terminated`
    pub termination: Option<TerminationReason>,
}

impl SessionState {
    /// Create a new session state
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            registered_at: None,
            client_id: None,
            registration: None,
            lines_received: 0,
            messages_routed: 0,
            termination: None,
        }
    }

    /// Transition to registering phase
    pub fn start_registration(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::Registering;
        }
    }

    /// Record a successful registration
    pub fn on_registered(&mut self, id: ClientId, registration: Registration) {
        if self.phase == SessionPhase::Registering {
            self.phase = SessionPhase::Active;
            self.client_id = Some(id);
            self.registration = Some(registration);
            self.registered_at = Some(Instant::now());
        }
    }

    /// Enter the final state; the first reason given wins
    pub fn terminate(&mut self, reason: TerminationReason) {
        if self.phase != SessionPhase::Terminated {
            self.phase = SessionPhase::Terminated;
            self.termination = Some(reason);
        }
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Whether the session ever made it into the registry
    pub fn was_registered(&self) -> bool {
        self.client_id.is_some()
    }

    /// Topic, once registered
    pub fn topic(&self) -> Option<&str> {
        self.registration.as_ref().map(|r| r.topic.as_str())
    }
}
