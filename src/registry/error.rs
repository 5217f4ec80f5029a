//! Registry error types
//!
//! Errors raised when handing a frame to a single consumer. They never abort
//! a broadcast; the relay logs them and moves on to the next consumer.

use thiserror::Error;

use super::consumer::ConsumerState;

/// Error type for per-consumer delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Consumer is not in the `Open` state (closing, closed or still connecting)
    #[error("consumer is not open (state: {0:?})")]
    NotOpen(ConsumerState),
    /// The connection's writer task has exited
    #[error("consumer disconnected")]
    Disconnected,
    /// The consumer's outbox is full
    #[error("consumer outbox full")]
    QueueFull,
}

impl DeliveryError {
    /// Whether the consumer should be dropped from the registry
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryError::QueueFull)
    }
}
