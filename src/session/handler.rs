//! Session driver
//!
//! Reads the registration line, registers the client, then relays lines
//! until the peer leaves or sends the termination sentinel.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use super::state::{SessionState, TerminationReason};
use crate::connection::{spawn_writer, LineReader, Outbox};
use crate::error::Error;
use crate::protocol::constants::{
    DEFAULT_MAX_LINE_LEN, DEFAULT_MAX_TOPIC_LEN, DEFAULT_OUTBOX_CAPACITY,
};
use crate::protocol::{confirmation_line, is_terminate, read_registration, Registration, Role};
use crate::registry::{ClientId, ClientRegistry, RegistryError};
use crate::router::Router;
use crate::stats::log_stats;

/// How long a closing session waits for queued frames to reach the socket
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-session input limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Registration topics are truncated to this many bytes
    pub max_topic_len: usize,
    /// Longer lines are relayed in pieces of this many bytes
    pub max_line_len: usize,
    /// Frames queued for this connection before deliveries are dropped
    pub outbox_capacity: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_topic_len: DEFAULT_MAX_TOPIC_LEN,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

/// Drive one connection until it terminates
///
/// The connection is closed by the time this returns. A session that got as
/// far as registering has also been removed from the registry.
pub async fn run_session<S, R>(
    stream: S,
    peer_addr: SocketAddr,
    router: Router<R>,
    limits: SessionLimits,
) -> SessionState
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    R: ClientRegistry + ?Sized,
{
    let mut state = SessionState::new(peer_addr);
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = LineReader::with_max_line_len(read_half, limits.max_line_len);
    let (outbox, writer) = spawn_writer(write_half, limits.outbox_capacity);

    state.start_registration();

    let registration = match read_registration(&mut reader, limits.max_topic_len).await {
        Ok(registration) => registration,
        Err(e) => {
            let reason = registration_failure(&e);
            tracing::debug!(peer = %peer_addr, error = %e, "Registration failed");
            state.terminate(reason);
            drop(outbox);
            finish_writer(writer).await;
            return state;
        }
    };

    let registry = router.registry();
    let id = match registry.insert(
        outbox.clone(),
        registration.role,
        registration.topic.clone(),
        peer_addr,
    ) {
        Ok(id) => id,
        Err(RegistryError::CapacityExceeded { capacity }) => {
            tracing::warn!(
                peer = %peer_addr,
                capacity = capacity,
                "Registration rejected: registry full"
            );
            state.terminate(TerminationReason::CapacityExceeded);
            drop(outbox);
            finish_writer(writer).await;
            return state;
        }
    };

    confirm(&outbox, id, &registration);
    // From here on the registry holds the only long-lived handle
    drop(outbox);

    tracing::info!(
        client_id = id,
        peer = %peer_addr,
        role = %registration.role,
        topic = %registration.topic,
        "Client registered"
    );
    state.on_registered(id, registration.clone());
    log_stats(&**registry);

    relay_lines(&mut reader, &router, id, &registration, &mut state).await;

    registry.remove(id);
    drop(reader);
    finish_writer(writer).await;

    tracing::info!(
        client_id = id,
        peer = %peer_addr,
        topic = %state.topic().unwrap_or_default(),
        reason = ?state.termination,
        lines = state.lines_received,
        duration_ms = state.duration().as_millis() as u64,
        "Client disconnected"
    );
    log_stats(&**registry);

    state
}

async fn relay_lines<Rd, R>(
    reader: &mut LineReader<Rd>,
    router: &Router<R>,
    id: ClientId,
    registration: &Registration,
    state: &mut SessionState,
) where
    Rd: AsyncRead + Unpin,
    R: ClientRegistry + ?Sized,
{
    while state.is_active() {
        let line = match reader.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                state.terminate(TerminationReason::PeerClosed);
                return;
            }
            Err(e) => {
                tracing::debug!(client_id = id, error = %e, "Read failed");
                state.terminate(TerminationReason::ReadError);
                return;
            }
        };

        state.lines_received += 1;

        if is_terminate(&line) {
            tracing::debug!(client_id = id, "Termination requested");
            state.terminate(TerminationReason::Sentinel);
            return;
        }

        match registration.role {
            Role::Publisher => {
                tracing::debug!(
                    client_id = id,
                    topic = %registration.topic,
                    message = %line,
                    "Publisher message"
                );
                router.route(&line, &registration.topic, id);
                state.messages_routed += 1;
            }
            Role::Subscriber => {
                tracing::debug!(
                    client_id = id,
                    topic = %registration.topic,
                    message = %line,
                    "Subscriber line ignored"
                );
            }
        }
    }
}

fn confirm(outbox: &Outbox, id: ClientId, registration: &Registration) {
    if outbox.send_line(confirmation_line(id, registration)).is_err() {
        tracing::debug!(client_id = id, "Confirmation not sent: connection closed");
    }
}

fn registration_failure(error: &Error) -> TerminationReason {
    match error {
        Error::Protocol(_) => TerminationReason::ProtocolError,
        e if e.is_disconnect() => TerminationReason::ClosedDuringRegistration,
        _ => TerminationReason::ReadError,
    }
}

// Outbox clones held by in-flight routes can keep the writer alive briefly.
async fn finish_writer(mut writer: JoinHandle<()>) {
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        tracing::debug!("Writer did not drain in time, aborting");
        writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::registry::{RegistryConfig, TopicRegistry};
    use crate::session::SessionPhase;

    struct Peer {
        reader: LineReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Peer {
        async fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
        }

        async fn recv(&mut self) -> Option<String> {
            tokio::time::timeout(Duration::from_secs(1), self.reader.read_line())
                .await
                .expect("timed out waiting for a line")
                .unwrap()
        }
    }

    fn start(registry: &Arc<TopicRegistry>) -> (Peer, JoinHandle<SessionState>) {
        start_with(registry, 4096, SessionLimits::default())
    }

    fn start_with(
        registry: &Arc<TopicRegistry>,
        pipe_size: usize,
        limits: SessionLimits,
    ) -> (Peer, JoinHandle<SessionState>) {
        let (client, server) = tokio::io::duplex(pipe_size);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000);
        let router = Router::new(Arc::clone(registry));
        let handle = tokio::spawn(run_session(server, addr, router, limits));

        let (read, write) = tokio::io::split(client);
        let peer = Peer {
            // Frames carry a prefix, so the peer reads without the server's limit
            reader: LineReader::with_max_line_len(read, 64 * 1024),
            writer: write,
        };
        (peer, handle)
    }

    #[tokio::test]
    async fn test_register_and_terminate() {
        let registry = Arc::new(TopicRegistry::new());
        let (mut peer, handle) = start(&registry);

        peer.send("PUBLISHER:weather\n").await;
        let reply = peer.recv().await.unwrap();
        assert!(reply.contains("PUBLISHER"));
        assert!(reply.contains("weather"));
        assert_eq!(registry.count(), 1);

        peer.send("terminate\n").await;
        let state = handle.await.unwrap();

        assert_eq!(state.phase, SessionPhase::Terminated);
        assert_eq!(state.termination, Some(TerminationReason::Sentinel));
        assert_eq!(state.client_id, Some(1));
        assert_eq!(state.messages_routed, 0);
        assert_eq!(registry.count(), 0);
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn test_publisher_reaches_subscriber() {
        let registry = Arc::new(TopicRegistry::new());
        let (mut sub, sub_handle) = start(&registry);
        let (mut publisher, pub_handle) = start(&registry);

        sub.send("SUBSCRIBER:weather\n").await;
        sub.recv().await.unwrap();
        publisher.send("PUBLISHER:weather\n").await;
        publisher.recv().await.unwrap();

        publisher.send("rain today\r\n").await;
        assert_eq!(
            sub.recv().await.as_deref(),
            Some("[weather] Publisher 2: rain today")
        );

        drop(publisher);
        let state = pub_handle.await.unwrap();
        assert_eq!(state.termination, Some(TerminationReason::PeerClosed));
        assert_eq!(state.messages_routed, 1);

        sub.send("terminate\n").await;
        sub_handle.await.unwrap();
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_routed_once() {
        let registry = Arc::new(TopicRegistry::new());
        let (mut sub, sub_handle) = start(&registry);
        let (mut publisher, pub_handle) = start(&registry);

        sub.send("SUBSCRIBER:t\n").await;
        sub.recv().await.unwrap();
        publisher.send("PUBLISHER:t\n").await;
        publisher.recv().await.unwrap();

        let line = "y".repeat(DEFAULT_MAX_LINE_LEN);
        publisher.send(&format!("{line}\n")).await;
        publisher.send("terminate\n").await;

        let state = pub_handle.await.unwrap();
        assert_eq!(state.lines_received, 2);
        assert_eq!(state.messages_routed, 1);
        assert_eq!(sub.recv().await, Some(format!("[t] Publisher 2: {line}")));

        sub.send("terminate\n").await;
        sub_handle.await.unwrap();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_stalled_subscriber_queue_is_bounded() {
        let registry = Arc::new(TopicRegistry::new());
        let limits = SessionLimits {
            outbox_capacity: 4,
            ..SessionLimits::default()
        };
        let (mut sub, sub_handle) = start_with(&registry, 64, limits);

        sub.send("SUBSCRIBER:t\n").await;
        sub.recv().await.unwrap();

        // The peer never reads again
        let router = Router::new(Arc::clone(&registry));
        let line = "z".repeat(1000);
        let (mut delivered, mut failed) = (0, 0);
        for _ in 0..1000 {
            let report = router.route(&line, "t", 999);
            delivered += report.delivered.len();
            failed += report.failed.len();
        }

        assert!(delivered <= limits.outbox_capacity + 1, "queued {delivered}");
        assert_eq!(delivered + failed, 1000);
        assert_eq!(registry.count(), 1);

        drop(sub);
        let state = sub_handle.await.unwrap();
        assert_eq!(state.termination, Some(TerminationReason::PeerClosed));
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_lines_are_not_routed() {
        let registry = Arc::new(TopicRegistry::new());
        let (mut chatty, chatty_handle) = start(&registry);
        let (mut other, other_handle) = start(&registry);

        chatty.send("SUBSCRIBER:t\n").await;
        chatty.recv().await.unwrap();
        other.send("SUBSCRIBER:t\n").await;
        other.recv().await.unwrap();

        chatty.send("hello?\n").await;
        chatty.send("terminate\n").await;
        let state = chatty_handle.await.unwrap();
        assert_eq!(state.lines_received, 2);
        assert_eq!(state.messages_routed, 0);

        other.send("terminate\n").await;
        other_handle.await.unwrap();
        // Nothing but EOF after the confirmation
        assert_eq!(other.recv().await, None);
    }

    #[tokio::test]
    async fn test_malformed_registration_closes_silently() {
        let registry = Arc::new(TopicRegistry::new());
        let (mut peer, handle) = start(&registry);

        peer.send("HELLO\n").await;
        let state = handle.await.unwrap();

        assert_eq!(state.termination, Some(TerminationReason::ProtocolError));
        assert!(!state.was_registered());
        assert_eq!(registry.count(), 0);
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_before_registration() {
        let registry = Arc::new(TopicRegistry::new());
        let (peer, handle) = start(&registry);

        drop(peer);
        let state = handle.await.unwrap();

        assert_eq!(
            state.termination,
            Some(TerminationReason::ClosedDuringRegistration)
        );
    }

    #[tokio::test]
    async fn test_full_registry_rejects_without_reply() {
        let registry = Arc::new(TopicRegistry::with_config(
            RegistryConfig::default().capacity(1),
        ));
        let (mut first, first_handle) = start(&registry);
        first.send("SUBSCRIBER:t\n").await;
        first.recv().await.unwrap();

        let (mut second, second_handle) = start(&registry);
        second.send("SUBSCRIBER:t\n").await;
        let state = second_handle.await.unwrap();

        assert_eq!(state.termination, Some(TerminationReason::CapacityExceeded));
        assert_eq!(second.recv().await, None);
        assert_eq!(registry.count(), 1);

        first.send("terminate\n").await;
        first_handle.await.unwrap();
    }

    #[test]
    fn test_default_limits() {
        let limits = SessionLimits::default();
        assert_eq!(limits.max_topic_len, DEFAULT_MAX_TOPIC_LEN);
        assert_eq!(limits.max_line_len, DEFAULT_MAX_LINE_LEN);
        assert_eq!(limits.outbox_capacity, DEFAULT_OUTBOX_CAPACITY);
    }
}
