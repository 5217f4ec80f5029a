//! Upstream MQTT feed
//!
//! Keeps one persistent broker connection, subscribes to the configured
//! topics on every (re)connect and yields each PUBLISH as a [`TopicEvent`],
//! in broker arrival order.
//!
//! Connection failures never end the feed. They are reported as
//! [`UpstreamEvent::Error`] on a separate status channel and the connection is
//! retried after [`FeedConfig::reconnect_delay`].

pub mod client;
pub mod config;
pub mod error;
pub mod event;

pub use client::{Feed, FeedClient, UpstreamEvents};
pub use config::{FeedConfig, Protocol, DEFAULT_TOPICS};
pub use error::UpstreamError;
pub use event::{TopicEvent, UpstreamEvent};
