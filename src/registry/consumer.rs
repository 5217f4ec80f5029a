//! Consumer connection and state types
//!
//! A consumer is one downstream WebSocket client. The relay never touches the
//! socket directly: it pushes encoded frames into the consumer's bounded
//! outbox and a per-connection writer task drains it.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Utf8Bytes;

use super::error::DeliveryError;

/// Encoded text frame queued for a consumer
///
/// `Utf8Bytes` is reference counted, so one encoded envelope is shared by
/// every outbox it is pushed into.
pub type Frame = Utf8Bytes;

/// Opaque consumer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Accepted, not yet registered
    Connecting,
    /// Registered and receiving broadcasts
    Open,
    /// Connection is shutting down, no new frames are accepted
    Closing,
    /// Removed from the registry (terminal)
    Closed,
}

/// One downstream push connection
#[derive(Debug)]
pub struct Consumer {
    id: ConsumerId,
    peer_addr: SocketAddr,
    state: watch::Sender<ConsumerState>,
    outbox: mpsc::Sender<Frame>,
    connected_at: Instant,
}

impl Consumer {
    /// Create a consumer in the `Connecting` state
    ///
    /// Returns the consumer and the receiving half of its outbox, which the
    /// connection's writer task drains.
    pub fn new(
        id: ConsumerId,
        peer_addr: SocketAddr,
        outbox_capacity: usize,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(outbox_capacity.max(1));

        let consumer = Self {
            id,
            peer_addr,
            state: watch::Sender::new(ConsumerState::Connecting),
            outbox: tx,
            connected_at: Instant::now(),
        };

        (consumer, rx)
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConsumerState::Open
    }

    /// Time since the connection was accepted
    pub fn age(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Queue a frame without waiting
    ///
    /// Fails if the consumer is not open, its writer is gone, or its outbox
    /// is full.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        let state = self.state();
        if state != ConsumerState::Open {
            return Err(DeliveryError::NotOpen(state));
        }

        self.outbox.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    /// Mark the connection as shutting down
    ///
    /// Only an open consumer can start closing. Returns whether the
    /// transition happened.
    pub fn begin_close(&self) -> bool {
        self.transition(ConsumerState::Open, ConsumerState::Closing)
    }

    /// `Connecting -> Open`, done by the registry on insert
    pub(super) fn open(&self) -> bool {
        self.transition(ConsumerState::Connecting, ConsumerState::Open)
    }

    /// Move to `Closed` from any state, returning the previous one
    pub(super) fn close(&self) -> ConsumerState {
        self.state.send_replace(ConsumerState::Closed)
    }

    /// Resolves once the consumer is `Closed`
    ///
    /// Lets the connection task notice that the registry dropped it.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|state| *state == ConsumerState::Closed).await;
    }

    fn transition(&self, from: ConsumerState, to: ConsumerState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}
