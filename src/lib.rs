//! MQTT to WebSocket fan-out relay
//!
//! One upstream MQTT subscription is multiplexed to every connected WebSocket
//! client so a browser dashboard can show live sensor readings without polling.
//!
//! # Architecture
//!
//! ```text
//!   broker ──► FeedClient ──► Feed (Stream<TopicEvent>)
//!                  │                  │
//!                  ▼                  ▼
//!            UpstreamEvents        Relay ──► registry.snapshot()
//!                  │                  │           │
//!                  ▼                  │           ▼
//!             Supervisor ◄──┐         └──► consumer.try_deliver(frame)
//!                  │        │                     │
//!                  ▼        │                     ▼
//!      Arc<ConsumerRegistry>│               outbox (mpsc)
//!                           │                     │
//!                      RelayServer ◄──────── writer task ──► WebSocket
//! ```
//!
//! The registry is the only shared mutable state. Writers (connect and
//! disconnect) serialize on a mutex, the relay reads a lock-free snapshot.

pub mod bridge;
pub mod envelope;
pub mod error;
pub mod feed;
pub mod registry;
pub mod relay;
pub mod server;
pub mod stats;
pub mod supervisor;

pub use bridge::{Bridge, BridgeConfig};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use feed::{Feed, FeedClient, FeedConfig, TopicEvent};
pub use registry::{Consumer, ConsumerId, ConsumerRegistry, ConsumerState};
pub use relay::{BroadcastOutcome, Relay};
pub use server::{RelayServer, ServerConfig};
pub use stats::RelayStats;
pub use supervisor::Supervisor;
