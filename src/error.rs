//! Error types
//!
//! Only startup and serving failures surface as [`Error`]. Per-message and
//! per-consumer failures are handled where they happen and only logged.

use thiserror::Error;

pub use crate::envelope::EnvelopeError;
pub use crate::feed::UpstreamError;
pub use crate::registry::DeliveryError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Socket level failure (bind, accept setup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or framing failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}
