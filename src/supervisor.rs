//! Connection lifecycle supervisor
//!
//! Single place where connection state changes are logged and applied to the
//! registry. Upstream events only produce log lines; reconnecting is left to
//! the feed. Downstream events register and unregister consumers.
//!
//! Per consumer: `Connecting -> Open -> Closed`. A closed consumer is never
//! reopened; a browser that reconnects gets a new id.

use std::sync::Arc;

use crate::feed::{UpstreamError, UpstreamEvent, UpstreamEvents};
use crate::registry::{Consumer, ConsumerId, ConsumerRegistry};
use crate::stats::RelayStats;

/// Applies lifecycle events to the registry
#[derive(Debug, Clone)]
pub struct Supervisor {
    registry: Arc<ConsumerRegistry>,
    stats: Arc<RelayStats>,
}

impl Supervisor {
    pub fn new(registry: Arc<ConsumerRegistry>, stats: Arc<RelayStats>) -> Self {
        Self { registry, stats }
    }

    pub fn registry(&self) -> &Arc<ConsumerRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    pub fn on_upstream_connected(&self, session_present: bool) {
        tracing::info!(session_present = session_present, "Connected to MQTT broker");
    }

    pub fn on_upstream_error(&self, error: &UpstreamError) {
        tracing::error!(error = %error, "MQTT error");
    }

    /// Register a freshly accepted consumer
    pub fn on_downstream_connected(&self, consumer: Arc<Consumer>) -> ConsumerId {
        let peer = consumer.peer_addr();
        let id = self.registry.register(Arc::clone(&consumer));
        if !consumer.is_open() {
            tracing::debug!(consumer_id = %id, state = ?consumer.state(), "WebSocket client not registered");
            return id;
        }
        self.stats.record_connected();

        tracing::info!(
            consumer_id = %id,
            peer = %peer,
            consumers = self.registry.len(),
            "WebSocket client connected"
        );
        id
    }

    /// Unregister a consumer whose connection ended
    ///
    /// Called by the connection task on exit and by the relay when a delivery
    /// finds the consumer gone. Only the first removal is logged and counted;
    /// returns whether this call removed it.
    pub fn on_downstream_disconnected(&self, id: ConsumerId) -> bool {
        let age = self.registry.get(id).map(|consumer| consumer.age());
        if self.registry.unregister(id) {
            self.stats.record_disconnected();
            tracing::info!(
                consumer_id = %id,
                connected_secs = age.unwrap_or_default().as_secs(),
                consumers = self.registry.len(),
                "WebSocket client disconnected"
            );
            true
        } else {
            tracing::debug!(consumer_id = %id, "WebSocket client already removed");
            false
        }
    }

    /// Consumers are receive-only; inbound messages are logged and ignored
    pub fn on_downstream_message(&self, id: ConsumerId, message: &str) {
        tracing::debug!(consumer_id = %id, message = %message, "Received message from client");
    }

    /// Dispatch one upstream status event
    pub fn on_upstream_event(&self, event: &UpstreamEvent) {
        match event {
            UpstreamEvent::Connected { session_present } => {
                self.on_upstream_connected(*session_present)
            }
            UpstreamEvent::Subscribed { pkid } => {
                tracing::debug!(pkid = *pkid, "Subscription acknowledged");
            }
            UpstreamEvent::Error(error) => self.on_upstream_error(error),
        }
    }

    /// Drain the feed's status channel until it closes
    pub async fn run_upstream(&self, mut events: UpstreamEvents) {
        while let Some(event) = events.recv().await {
            self.on_upstream_event(&event);
        }
        tracing::debug!("Upstream status channel closed");
    }
}
