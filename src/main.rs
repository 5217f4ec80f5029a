//! sensor-relay: forward MQTT sensor readings to WebSocket dashboards
//!
//! Every option can also be set through the environment variable shown in
//! `--help`.
//!
//! Examples:
//!   sensor-relay --mqtt-host broker.example.com --mqtt-username dash --mqtt-password secret
//!   MQTT_HOST=localhost MQTT_PROTOCOL=mqtt sensor-relay --ws-bind 127.0.0.1:8080
//!   sensor-relay --topic sensor/temperature --topic sensor/humidity

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use sensor_relay::feed::{Protocol, DEFAULT_TOPICS};
use sensor_relay::{Bridge, BridgeConfig, Error, FeedConfig, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "sensor-relay", version, about = "Relay MQTT sensor topics to WebSocket clients")]
struct Args {
    /// MQTT broker host
    #[arg(long, env = "MQTT_HOST", default_value = "localhost")]
    mqtt_host: String,

    /// MQTT broker port (defaults to 8883 for mqtts, 1883 for mqtt)
    #[arg(long, env = "MQTT_PORT")]
    mqtt_port: Option<u16>,

    /// Broker protocol: mqtt or mqtts
    #[arg(long, env = "MQTT_PROTOCOL", default_value = "mqtts")]
    mqtt_protocol: String,

    /// Broker username
    #[arg(long, env = "MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// Broker password
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// MQTT client id
    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "sensor-relay")]
    mqtt_client_id: String,

    /// Topic to subscribe to (repeatable, comma separated in the environment)
    #[arg(long = "topic", env = "MQTT_TOPICS", value_delimiter = ',')]
    topics: Vec<String>,

    /// Seconds between reconnect attempts
    #[arg(long, env = "MQTT_RECONNECT_SECS", default_value_t = 1)]
    reconnect_secs: u64,

    /// WebSocket bind address
    #[arg(long, env = "WS_BIND_ADDR", default_value = "0.0.0.0:8080")]
    ws_bind: SocketAddr,

    /// Maximum concurrent WebSocket clients (0 = unlimited)
    #[arg(long, env = "WS_MAX_CONNECTIONS", default_value_t = 0)]
    ws_max_connections: usize,

    /// Frames buffered per client before new readings are dropped
    #[arg(long, env = "WS_QUEUE_CAPACITY", default_value_t = 256)]
    ws_queue_capacity: usize,
}

impl Args {
    fn into_config(self) -> Result<BridgeConfig, Error> {
        let protocol: Protocol = self.mqtt_protocol.parse().map_err(Error::Config)?;
        let port = self.mqtt_port.unwrap_or_else(|| protocol.default_port());

        let topics = if self.topics.is_empty() {
            DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
        } else {
            self.topics
        };

        let mut feed = FeedConfig::new(self.mqtt_host, port)
            .protocol(protocol)
            .client_id(self.mqtt_client_id)
            .topics(topics)
            .reconnect_delay(Duration::from_secs(self.reconnect_secs));
        feed.username = self.mqtt_username;
        feed.password = self.mqtt_password;

        let server = ServerConfig::with_addr(self.ws_bind)
            .max_connections(self.ws_max_connections)
            .outbox_capacity(self.ws_queue_capacity);

        Ok(BridgeConfig::new(feed, server))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sensor_relay=info".parse()?),
        )
        .init();

    let config = Args::parse().into_config()?;
    tracing::info!(?config, "Starting sensor relay");

    let bridge = Bridge::new(config);
    bridge
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["sensor-relay"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).into_config().unwrap();

        assert_eq!(config.feed.protocol, Protocol::Mqtts);
        assert_eq!(config.feed.port, 8883);
        assert_eq!(config.feed.topics.len(), DEFAULT_TOPICS.len());
        assert_eq!(config.server.bind_addr.port(), 8080);
    }

    #[test]
    fn test_plain_mqtt_default_port() {
        let config = parse(&["--mqtt-protocol", "mqtt"]).into_config().unwrap();

        assert_eq!(config.feed.port, 1883);
    }

    #[test]
    fn test_topics_override() {
        let config = parse(&["--topic", "a/b", "--topic", "c/d"])
            .into_config()
            .unwrap();

        assert_eq!(config.feed.topics, vec!["a/b", "c/d"]);
    }

    #[test]
    fn test_invalid_protocol() {
        let result = parse(&["--mqtt-protocol", "ftp"]).into_config();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
