//! Fan-out relay
//!
//! Broadcasts every upstream event to every open consumer. Delivery is
//! at-most-once and best-effort: each consumer is tried independently and a
//! failure for one never affects the others.
//!
//! One task drives the relay, so broadcasts never overlap. Together with the
//! FIFO outboxes this keeps every consumer's frames in upstream order.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};

use crate::envelope;
use crate::feed::TopicEvent;
use crate::registry::{ConsumerRegistry, DeliveryError, Frame};
use crate::stats::RelayStats;
use crate::supervisor::Supervisor;

/// Result of one broadcast pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Consumers the envelope was queued for
    pub delivered: usize,
    /// Consumers skipped because they were closed or gone
    pub skipped: usize,
    /// Consumers whose outbox was full
    pub dropped: usize,
}

impl BroadcastOutcome {
    /// Number of delivery attempts made
    pub fn attempts(&self) -> usize {
        self.delivered + self.skipped + self.dropped
    }
}

/// Upstream → consumers fan-out
#[derive(Debug, Clone)]
pub struct Relay {
    registry: Arc<ConsumerRegistry>,
    stats: Arc<RelayStats>,
    // Dead consumers found while delivering are removed like any disconnect
    supervisor: Supervisor,
}

impl Relay {
    pub fn new(registry: Arc<ConsumerRegistry>, stats: Arc<RelayStats>) -> Self {
        let supervisor = Supervisor::new(Arc::clone(&registry), Arc::clone(&stats));
        Self {
            registry,
            stats,
            supervisor,
        }
    }

    pub fn registry(&self) -> &Arc<ConsumerRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Broadcast one upstream event to the current consumers
    pub fn on_upstream_event(&self, event: TopicEvent) -> BroadcastOutcome {
        self.stats.record_event();

        let (topic, payload) = event.into_parts();
        let text = match envelope::encode(&topic, &payload) {
            Ok(text) => text,
            Err(e) => {
                self.stats.record_protocol_error();
                tracing::error!(topic = %topic, error = %e, "Dropping upstream message");
                return BroadcastOutcome::default();
            }
        };

        tracing::debug!(
            topic = %topic,
            value = %String::from_utf8_lossy(&payload),
            "Received upstream message"
        );

        let consumers = self.registry.snapshot();
        let mut outcome = BroadcastOutcome::default();
        if consumers.is_empty() {
            return outcome;
        }

        // Encoded once, shared by every outbox
        let frame = Frame::from(text);

        for consumer in consumers.iter() {
            match consumer.try_deliver(frame.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(DeliveryError::QueueFull) => {
                    outcome.dropped += 1;
                    tracing::warn!(
                        consumer_id = %consumer.id(),
                        topic = %topic,
                        "Consumer outbox full, envelope dropped"
                    );
                }
                Err(e) => {
                    outcome.skipped += 1;
                    tracing::debug!(
                        consumer_id = %consumer.id(),
                        error = %e,
                        "Skipping consumer"
                    );
                    if e.is_terminal() {
                        self.supervisor.on_downstream_disconnected(consumer.id());
                    }
                }
            }
        }

        self.stats.record_delivered(outcome.delivered as u64);
        self.stats.record_skipped(outcome.skipped as u64);
        self.stats.record_dropped(outcome.dropped as u64);

        outcome
    }

    /// Broadcast every event of `events` until the stream ends
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = TopicEvent>,
    {
        tokio::pin!(events);

        while let Some(event) = events.next().await {
            self.on_upstream_event(event);
        }

        tracing::info!("Upstream feed ended, relay stopped");
    }
}
