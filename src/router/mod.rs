//! Broadcast router
//!
//! Fans a publisher's line out to every subscriber on the same topic. The
//! recipient set comes from a registry snapshot; delivery is an enqueue on
//! each subscriber's outbox, so the registry lock is never held while
//! anything touches a socket.
//!
//! A failed delivery is logged and skipped. That covers a connection that has
//! gone away and a subscriber whose outbox is full because it stopped
//! reading. The subscriber stays registered until its own session notices the
//! broken connection.

pub mod frame;

use std::sync::Arc;

use crate::registry::{ClientFilter, ClientId, ClientRegistry};

pub use frame::publisher_frame;

/// Outcome of one `route` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// Subscribers the frame was queued for
    pub delivered: Vec<ClientId>,
    /// Subscribers that did not get the frame: connection gone or outbox full
    pub failed: Vec<ClientId>,
}

impl RouteReport {
    /// Number of subscribers in the snapshot
    pub fn recipients(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Routes publisher lines to subscribers
pub struct Router<R: ?Sized> {
    registry: Arc<R>,
}

impl<R: ?Sized> Clone for Router<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R> Router<R>
where
    R: ClientRegistry + ?Sized,
{
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Registry this router reads from
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Deliver `message` to every subscriber on `topic` except `sender`
    ///
    /// Never fails from the caller's point of view; see [`RouteReport`] for
    /// per-subscriber outcomes.
    pub fn route(&self, message: &str, topic: &str, sender: ClientId) -> RouteReport {
        let filter = ClientFilter::subscribers_of(topic).excluding(sender);
        let recipients = self.registry.snapshot_matching(&|client| filter.matches(client));

        let mut report = RouteReport::default();
        if recipients.is_empty() {
            return report;
        }

        let frame = publisher_frame(topic, sender, message);
        for client in recipients {
            match client.outbox().send(frame.clone()) {
                Ok(()) => report.delivered.push(client.id),
                Err(e) => {
                    tracing::warn!(
                        client_id = client.id,
                        peer = %client.peer_addr,
                        topic = %topic,
                        error = %e,
                        "Delivery failed"
                    );
                    report.failed.push(client.id);
                }
            }
        }

        tracing::debug!(
            sender = sender,
            topic = %topic,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Broadcast routed"
        );

        report
    }
}
