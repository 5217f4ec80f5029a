//! Downstream WebSocket server
//!
//! Accepts browser connections and turns each into a registered consumer.
//! Every broadcast reaches the browser as one text frame holding the JSON
//! envelope; anything the browser sends is logged and ignored.

pub mod config;
mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;
