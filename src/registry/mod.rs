//! Consumer registry for downstream fan-out
//!
//! The registry tracks every open WebSocket consumer. It is the only mutable
//! state shared between the accept path, the lifecycle supervisor and the
//! relay.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ConsumerRegistry>
//!                  ┌──────────────────────────────┐
//!   register() ──► │ consumers: Mutex<BTreeMap<   │
//! unregister() ──► │   ConsumerId, Arc<Consumer>>>│
//!                  │              │ rebuild       │
//!                  │              ▼               │
//!                  │ snapshot: ArcSwap<Vec<..>>   │ ──► snapshot() (lock-free)
//!                  └──────────────────────────────┘
//!                                                        │
//!                       Relay ◄──────────────────────────┘
//!                         │
//!                         └──► consumer.try_deliver(frame) ──► outbox ──► socket
//! ```
//!
//! # Membership and state
//!
//! A consumer becomes `Open` when inserted and `Closed` when removed, both
//! under the writer lock. A snapshot taken before a removal still holds the
//! `Arc`, but the consumer reports `Closed` and the relay skips it.

pub mod consumer;
pub mod error;
pub mod store;

pub use consumer::{Consumer, ConsumerId, ConsumerState, Frame};
pub use error::DeliveryError;
pub use store::{ConsumerRegistry, Snapshot};
