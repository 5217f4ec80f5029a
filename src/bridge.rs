//! Process wiring
//!
//! Builds the shared registry and stats, starts the upstream feed, the relay
//! task, the upstream status task and the WebSocket server, and tears them
//! down on shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::feed::{FeedClient, FeedConfig};
use crate::registry::ConsumerRegistry;
use crate::relay::Relay;
use crate::server::{RelayServer, ServerConfig};
use crate::stats::RelayStats;
use crate::supervisor::Supervisor;

/// Configuration for the whole bridge
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Upstream broker
    pub feed: FeedConfig,
    /// Downstream WebSocket server
    pub server: ServerConfig,
}

impl BridgeConfig {
    pub fn new(feed: FeedConfig, server: ServerConfig) -> Self {
        Self { feed, server }
    }
}

/// MQTT to WebSocket bridge
pub struct Bridge {
    config: BridgeConfig,
    registry: Arc<ConsumerRegistry>,
    stats: Arc<RelayStats>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ConsumerRegistry::new()),
            stats: Arc::new(RelayStats::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ConsumerRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Run until `shutdown` resolves
    ///
    /// The WebSocket port is bound before the broker connection starts, so a
    /// bind failure is reported without touching the upstream.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        tracing::info!(addr = %self.config.server.bind_addr, "WebSocket server listening");

        let supervisor = Supervisor::new(Arc::clone(&self.registry), Arc::clone(&self.stats));
        let relay = Relay::new(Arc::clone(&self.registry), Arc::clone(&self.stats));

        let (feed, upstream_events) = FeedClient::connect(self.config.feed.clone());

        let relay_task = tokio::spawn(async move { relay.run(feed).await });
        let status_task = {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { supervisor.run_upstream(upstream_events).await })
        };

        let server = RelayServer::new(self.config.server.clone(), supervisor);
        let result = server.serve(listener, shutdown).await;

        // Dropping the feed inside the relay task stops the MQTT connection
        relay_task.abort();
        status_task.abort();

        let closed = self.registry.clear();
        let stats = self.stats.snapshot();
        tracing::info!(
            consumers_closed = closed,
            events = stats.events_received,
            delivered = stats.envelopes_delivered,
            skipped = stats.deliveries_skipped,
            dropped = stats.envelopes_dropped,
            protocol_errors = stats.protocol_errors,
            uptime_secs = stats.uptime.as_secs(),
            "Bridge stopped"
        );

        result
    }
}
