//! Upstream feed configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default sensor topics subscribed at connect time
pub const DEFAULT_TOPICS: &[&str] = &[
    "sensor/temperature",
    "sensor/pressure",
    "sensor/latitude",
    "sensor/longitude",
];

/// Broker transport scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Plain TCP
    Mqtt,
    /// TLS over TCP
    #[default]
    Mqtts,
}

impl Protocol {
    /// Conventional broker port for the scheme
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Mqtt => 1883,
            Protocol::Mqtts => 8883,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Mqtt => "mqtt",
            Protocol::Mqtts => "mqtts",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mqtt" | "tcp" => Ok(Protocol::Mqtt),
            "mqtts" | "ssl" | "tls" => Ok(Protocol::Mqtts),
            other => Err(format!(
                "unsupported protocol '{}', expected 'mqtt' or 'mqtts'",
                other
            )),
        }
    }
}

/// Broker connection options
#[derive(Clone)]
pub struct FeedConfig {
    /// Broker host name
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Transport scheme
    pub protocol: Protocol,

    /// Username for broker authentication
    pub username: Option<String>,

    /// Password for broker authentication
    pub password: Option<String>,

    /// MQTT client identifier
    pub client_id: String,

    /// Topics subscribed on every (re)connect
    pub topics: Vec<String>,

    /// MQTT keep-alive interval
    pub keep_alive: Duration,

    /// Pause between reconnect attempts after an error
    pub reconnect_delay: Duration,

    /// Capacity of the event channel between the MQTT task and the feed
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: Protocol::Mqtts.default_port(),
            protocol: Protocol::Mqtts,
            username: None,
            password: None,
            client_id: "sensor-relay".to_string(),
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            keep_alive: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(1),
            channel_capacity: 1024,
        }
    }
}

impl FeedConfig {
    /// Create a config for the given broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the transport scheme
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the client id
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Replace the topic list
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set keep-alive interval
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Set reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Broker address as `host:port`
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Manual impl so the password never ends up in logs
impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("topics", &self.topics)
            .field("keep_alive", &self.keep_alive)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();

        assert_eq!(config.port, 8883);
        assert_eq!(config.protocol, Protocol::Mqtts);
        assert!(config.username.is_none());
        assert_eq!(
            config.topics,
            vec![
                "sensor/temperature",
                "sensor/pressure",
                "sensor/latitude",
                "sensor/longitude"
            ]
        );
    }

    #[test]
    fn test_builder_chaining() {
        let config = FeedConfig::new("broker.example.com", 1883)
            .protocol(Protocol::Mqtt)
            .credentials("user", "secret")
            .client_id("dashboard-1")
            .topics(["sensor/temperature"])
            .keep_alive(Duration::from_secs(10))
            .reconnect_delay(Duration::from_millis(250));

        assert_eq!(config.broker_addr(), "broker.example.com:1883");
        assert_eq!(config.protocol, Protocol::Mqtt);
        assert_eq!(config.username.as_deref(), Some("user"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.client_id, "dashboard-1");
        assert_eq!(config.topics, vec!["sensor/temperature"]);
        assert_eq!(config.keep_alive, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!("mqtt".parse::<Protocol>().unwrap(), Protocol::Mqtt);
        assert_eq!("MQTTS".parse::<Protocol>().unwrap(), Protocol::Mqtts);
        assert_eq!(" tls ".parse::<Protocol>().unwrap(), Protocol::Mqtts);
        assert!("ws".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_protocol_default_port() {
        assert_eq!(Protocol::Mqtt.default_port(), 1883);
        assert_eq!(Protocol::Mqtts.default_port(), 8883);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = FeedConfig::default().credentials("user", "hunter2");
        let debug = format!("{:?}", config);

        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }
}
