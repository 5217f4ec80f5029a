//! Relay counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live relay counters, updated from the relay and server tasks
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    events_received: AtomicU64,
    protocol_errors: AtomicU64,
    envelopes_delivered: AtomicU64,
    deliveries_skipped: AtomicU64,
    envelopes_dropped: AtomicU64,
    consumers_connected: AtomicU64,
    consumers_disconnected: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Upstream events handed to the relay
    pub events_received: u64,
    /// Upstream events dropped because they could not be encoded
    pub protocol_errors: u64,
    /// Envelopes queued to a consumer
    pub envelopes_delivered: u64,
    /// Deliveries skipped because the consumer was gone
    pub deliveries_skipped: u64,
    /// Envelopes dropped because a consumer's outbox was full
    pub envelopes_dropped: u64,
    /// Consumers ever registered
    pub consumers_connected: u64,
    /// Consumers ever unregistered
    pub consumers_disconnected: u64,
    /// Time since the stats were created
    pub uptime: Duration,
}

impl StatsSnapshot {
    /// Consumers currently connected according to the counters
    pub fn active_consumers(&self) -> u64 {
        self.consumers_connected
            .saturating_sub(self.consumers_disconnected)
    }
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            events_received: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            envelopes_delivered: AtomicU64::new(0),
            deliveries_skipped: AtomicU64::new(0),
            envelopes_dropped: AtomicU64::new(0),
            consumers_connected: AtomicU64::new(0),
            consumers_disconnected: AtomicU64::new(0),
        }
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, count: u64) {
        self.envelopes_delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, count: u64) {
        self.deliveries_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.envelopes_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_connected(&self) {
        self.consumers_connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnected(&self) {
        self.consumers_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            envelopes_delivered: self.envelopes_delivered.load(Ordering::Relaxed),
            deliveries_skipped: self.deliveries_skipped.load(Ordering::Relaxed),
            envelopes_dropped: self.envelopes_dropped.load(Ordering::Relaxed),
            consumers_connected: self.consumers_connected.load(Ordering::Relaxed),
            consumers_disconnected: self.consumers_disconnected.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_new() {
        let stats = RelayStats::new().snapshot();
        assert_eq!(stats.events_received, 0);
        assert_eq!(stats.protocol_errors, 0);
        assert_eq!(stats.envelopes_delivered, 0);
        assert_eq!(stats.deliveries_skipped, 0);
        assert_eq!(stats.envelopes_dropped, 0);
        assert_eq!(stats.active_consumers(), 0);
    }

    #[test]
    fn test_relay_stats_counters() {
        let stats = RelayStats::new();
        stats.record_event();
        stats.record_event();
        stats.record_protocol_error();
        stats.record_delivered(3);
        stats.record_skipped(1);
        stats.record_dropped(2);
        stats.record_connected();
        stats.record_connected();
        stats.record_disconnected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_received, 2);
        assert_eq!(snapshot.protocol_errors, 1);
        assert_eq!(snapshot.envelopes_delivered, 3);
        assert_eq!(snapshot.deliveries_skipped, 1);
        assert_eq!(snapshot.envelopes_dropped, 2);
        assert_eq!(snapshot.active_consumers(), 1);
    }

    #[test]
    fn test_active_consumers_never_underflows() {
        let snapshot = StatsSnapshot {
            consumers_disconnected: 2,
            ..Default::default()
        };
        assert_eq!(snapshot.active_consumers(), 0);
    }
}
