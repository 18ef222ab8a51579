//! Protocol constants

/// Separator between role and topic on the registration line
pub const REGISTRATION_SEPARATOR: char = ':';

/// Role token for publishers
pub const PUBLISHER_TOKEN: &str = "PUBLISHER";

/// Role token for subscribers
pub const SUBSCRIBER_TOKEN: &str = "SUBSCRIBER";

/// Any line starting with this ends the session
pub const TERMINATE_SENTINEL: &str = "terminate";

/// Longest topic kept from a registration line, in bytes
pub const DEFAULT_MAX_TOPIC_LEN: usize = 63;

/// Longest line handed to the router in one piece, in bytes
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Default cap on concurrent connections
pub const DEFAULT_MAX_CLIENTS: usize = 50;

/// Default relay port
pub const DEFAULT_PORT: u16 = 5000;

/// Frames queued per connection before further deliveries are dropped
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;
