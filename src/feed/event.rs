//! Feed event types

use bytes::Bytes;

use super::error::UpstreamError;

/// One message received from the broker
///
/// Cheap to clone: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEvent {
    topic: String,
    payload: Bytes,
}

impl TopicEvent {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_parts(self) -> (String, Bytes) {
        (self.topic, self.payload)
    }
}

/// Connection status reported by the feed
#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    /// Broker accepted the connection; subscriptions were (re)issued
    Connected {
        /// Whether the broker resumed a previous session
        session_present: bool,
    },

    /// Broker acknowledged a subscription
    Subscribed {
        /// Packet id of the SUBSCRIBE being acknowledged
        pkid: u16,
    },

    /// Connection or protocol error; the feed keeps retrying
    Error(UpstreamError),
}
