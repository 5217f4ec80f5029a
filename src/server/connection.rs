//! Per-connection task
//!
//! Runs the WebSocket handshake, registers the consumer through the
//! supervisor, then loops:
//!
//! - outbox frame → text message to the client
//! - inbound message → logged and ignored
//! - close frame, socket error or registry removal → unregister and exit

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::accept_async;

use crate::error::{Error, Result};
use crate::registry::{Consumer, ConsumerId};
use crate::server::config::ServerConfig;
use crate::supervisor::Supervisor;

/// One accepted downstream connection
pub(crate) struct Connection {
    id: ConsumerId,
    socket: TcpStream,
    peer_addr: SocketAddr,
    outbox_capacity: usize,
    handshake_timeout: Duration,
    supervisor: Supervisor,
}

impl Connection {
    pub(crate) fn new(
        id: ConsumerId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: &ServerConfig,
        supervisor: Supervisor,
    ) -> Self {
        Self {
            id,
            socket,
            peer_addr,
            outbox_capacity: config.outbox_capacity,
            handshake_timeout: config.handshake_timeout,
            supervisor,
        }
    }

    /// Serve the connection until it closes
    pub(crate) async fn run(self) -> Result<()> {
        let ws_stream = tokio::time::timeout(self.handshake_timeout, accept_async(self.socket))
            .await
            .map_err(|_| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "WebSocket handshake timed out",
                ))
            })??;

        let (consumer, mut outbox) = Consumer::new(self.id, self.peer_addr, self.outbox_capacity);
        let consumer = Arc::new(consumer);
        let id = self.supervisor.on_downstream_connected(Arc::clone(&consumer));

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let closed = consumer.closed();
        tokio::pin!(closed);

        let result: Result<()> = loop {
            tokio::select! {
                frame = outbox.recv() => {
                    let Some(frame) = frame else { break Ok(()) };
                    if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                        // Client gone mid-send: this task exits, others unaffected
                        break Err(e.into());
                    }
                }
                message = ws_receiver.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        self.supervisor.on_downstream_message(id, text.as_str());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        self.supervisor
                            .on_downstream_message(id, &String::from_utf8_lossy(&data));
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    // Ping/pong are answered by tungstenite
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                },
                _ = &mut closed => {
                    tracing::debug!(consumer_id = %id, "Consumer removed by registry");
                    break Ok(());
                }
            }
        };

        consumer.begin_close();
        self.supervisor.on_downstream_disconnected(id);
        let _ = ws_sender.close().await;

        result
    }
}
