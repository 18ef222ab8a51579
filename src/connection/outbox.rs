//! Outbound side of a connection
//!
//! Each connection gets a bounded queue of frames drained by a dedicated
//! writer task. Senders never wait on the socket: when a peer stops reading
//! and its queue fills up, further frames are refused instead of piling up
//! in memory.
//!
//! The connection is closed when the last `Outbox` clone is dropped: the
//! writer task drains what is queued, shuts the write half down and exits.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A frame could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OutboxError {
    /// Peer is not keeping up; the frame was dropped
    #[error("connection outbox is full")]
    Full,

    /// The writer task is gone; nothing more can be sent on this connection
    #[error("connection outbox is closed")]
    Closed,
}

/// Handle for queueing frames to one connection
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Bytes>,
}

impl Outbox {
    /// Create a detached outbox holding up to `capacity` frames (at least one)
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a pre-framed message without waiting
    pub fn send(&self, frame: Bytes) -> Result<(), OutboxError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => OutboxError::Full,
            mpsc::error::TrySendError::Closed(_) => OutboxError::Closed,
        })
    }

    /// Queue a text line; `line` must already carry its terminator
    pub fn send_line(&self, line: impl Into<String>) -> Result<(), OutboxError> {
        self.send(Bytes::from(line.into()))
    }

    /// Whether the writer side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task for a connection
///
/// The task ends when every `Outbox` clone is dropped or the first write
/// fails. Either way the write half is shut down before the task exits.
pub fn spawn_writer<W>(writer: W, capacity: usize) -> (Outbox, JoinHandle<()>)
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let (outbox, rx) = Outbox::bounded(capacity);
    let handle = tokio::spawn(drain(writer, rx));
    (outbox, handle)
}

async fn drain<W>(mut writer: W, mut rx: mpsc::Receiver<Bytes>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            tracing::debug!(error = %e, "Connection write failed");
            break;
        }
    }

    // Refuse further frames before tearing down the socket
    rx.close();
    if let Err(e) = writer.shutdown().await {
        tracing::trace!(error = %e, "Connection shutdown failed");
    }
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::DEFAULT_OUTBOX_CAPACITY;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_frames_written_in_order() {
        let mock = Builder::new().write(b"one\n").write(b"two\n").build();
        let (outbox, handle) = spawn_writer(mock, DEFAULT_OUTBOX_CAPACITY);

        outbox.send_line("one\n").unwrap();
        outbox.send(Bytes::from_static(b"two\n")).unwrap();
        drop(outbox);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_keep_connection_open() {
        let mock = Builder::new().write(b"late\n").build();
        let (outbox, handle) = spawn_writer(mock, DEFAULT_OUTBOX_CAPACITY);
        let clone = outbox.clone();

        drop(outbox);
        clone.send_line("late\n").unwrap();
        drop(clone);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_fails_after_write_error() {
        let mock = Builder::new()
            .write_error(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            .build();
        let (outbox, handle) = spawn_writer(mock, DEFAULT_OUTBOX_CAPACITY);

        outbox.send_line("lost\n").unwrap();
        handle.await.unwrap();

        assert!(outbox.is_closed());
        assert_eq!(outbox.send_line("after\n"), Err(OutboxError::Closed));
    }

    #[tokio::test]
    async fn test_stalled_peer_fills_queue() {
        // Peer never reads: the writer blocks on the first frame
        let (_peer, server) = tokio::io::duplex(8);
        let (outbox, handle) = spawn_writer(server, 2);
        let frame = Bytes::from(vec![b'x'; 64]);

        outbox.send(frame.clone()).unwrap();
        tokio::task::yield_now().await;

        let mut results = Vec::new();
        for _ in 0..10 {
            results.push(outbox.send(frame.clone()));
        }

        assert!(results.iter().filter(|r| r.is_ok()).count() <= 2);
        assert!(results.contains(&Err(OutboxError::Full)));

        handle.abort();
    }

    #[test]
    fn test_detached_outbox() {
        let (outbox, mut rx) = Outbox::bounded(1);
        outbox.send_line("x\n").unwrap();
        assert_eq!(outbox.send_line("y\n"), Err(OutboxError::Full));
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"x\n"));

        drop(rx);
        assert!(outbox.is_closed());
        assert_eq!(outbox.send_line("z\n"), Err(OutboxError::Closed));
    }
}
