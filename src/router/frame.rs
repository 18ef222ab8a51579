//! Outbound message framing

use bytes::{BufMut, Bytes, BytesMut};

use crate::registry::ClientId;

/// Frame a publisher's line for subscriber display
///
/// Produces `[<topic>] Publisher <id>: <message>\n`. The frame is built once
/// per route and shared by every recipient.
pub fn publisher_frame(topic: &str, sender: ClientId, message: &str) -> Bytes {
    let id = sender.to_string();
    let mut buf = BytesMut::with_capacity(topic.len() + id.len() + message.len() + 16);

    buf.put_u8(b'[');
    buf.put_slice(topic.as_bytes());
    buf.put_slice(b"] Publisher ");
    buf.put_slice(id.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(message.as_bytes());
    buf.put_u8(b'\n');

    buf.freeze()
}
