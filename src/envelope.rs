//! Message envelope codec
//!
//! Each upstream `(topic, payload)` pair is sent to consumers as one JSON text
//! frame:
//!
//! ```text
//! {"topic":"sensor/temperature","value":"23.5"}
//! ```
//!
//! The payload is carried as text exactly as received. No numeric parsing or
//! type coercion happens on the relay path. Encoding is one-directional;
//! consumers never send envelopes back.

use serde::Serialize;
use thiserror::Error;

/// Envelope encoding failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Payload bytes are not valid UTF-8
    #[error("payload on '{topic}' is not valid UTF-8 (invalid byte at offset {valid_up_to})")]
    InvalidUtf8 { topic: String, valid_up_to: usize },
}

/// Serialized form of a topic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Envelope<'a> {
    /// Topic the reading was published on
    pub topic: &'a str,
    /// Textual payload
    pub value: &'a str,
}

impl<'a> Envelope<'a> {
    /// Build an envelope from already decoded text
    pub fn new(topic: &'a str, value: &'a str) -> Self {
        Self { topic, value }
    }

    /// Build an envelope from a raw payload, decoding it as UTF-8
    pub fn from_payload(topic: &'a str, payload: &'a [u8]) -> Result<Self, EnvelopeError> {
        let value = std::str::from_utf8(payload).map_err(|e| EnvelopeError::InvalidUtf8 {
            topic: topic.to_string(),
            valid_up_to: e.valid_up_to(),
        })?;
        Ok(Self { topic, value })
    }

    /// Serialize to the wire text
    pub fn to_json(&self) -> String {
        // Two string fields cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Encode a topic and raw payload into envelope text
pub fn encode(topic: &str, payload: &[u8]) -> Result<String, EnvelopeError> {
    Envelope::from_payload(topic, payload).map(|envelope| envelope.to_json())
}
