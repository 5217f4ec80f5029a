//! Upstream error types

use rumqttc::{ConnectionError, StateError};
use thiserror::Error;

/// Error reported on the feed's status channel
///
/// None of these stop the feed. The MQTT event loop reconnects on its next
/// poll.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Broker unreachable, connection lost, keep-alive timeout, TLS failure
    /// or authentication rejected
    #[error("upstream connection error: {0}")]
    Connection(String),

    /// Malformed or unexpected packet from the broker
    #[error("upstream protocol error: {0}")]
    Protocol(String),
}

impl UpstreamError {
    pub fn is_protocol(&self) -> bool {
        matches!(self, UpstreamError::Protocol(_))
    }
}

impl From<ConnectionError> for UpstreamError {
    fn from(err: ConnectionError) -> Self {
        match err {
            // Socket failures and missed pings surface through the state machine
            ConnectionError::MqttState(state @ (StateError::Io(_) | StateError::AwaitPingResp)) => {
                UpstreamError::Connection(state.to_string())
            }
            ConnectionError::MqttState(state) => UpstreamError::Protocol(state.to_string()),
            other => UpstreamError::Connection(other.to_string()),
        }
    }
}
