//! End-to-end fan-out through real WebSocket connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use sensor_relay::{
    ConsumerRegistry, Relay, RelayServer, RelayStats, ServerConfig, Supervisor, TopicEvent,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    addr: SocketAddr,
    relay: Relay,
    registry: Arc<ConsumerRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let registry = Arc::new(ConsumerRegistry::new());
        let stats = Arc::new(RelayStats::new());
        let supervisor = Supervisor::new(Arc::clone(&registry), Arc::clone(&stats));
        let relay = Relay::new(Arc::clone(&registry), stats);

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let server = RelayServer::new(config, supervisor);
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            relay,
            registry,
            shutdown: Some(tx),
            server,
        }
    }

    async fn connect(&self) -> Client {
        let url = format!("ws://{}/", self.addr);
        let (client, _) = connect_async(url).await.unwrap();
        client
    }

    async fn wait_for_consumers(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.registry.len() != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("consumer count not reached");
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.server.await.unwrap();
    }
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = message {
            return text.as_str().to_string();
        }
    }
}

async fn assert_no_frame(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(100), client.next()).await;
    assert!(result.is_err(), "unexpected frame: {:?}", result);
}

#[tokio::test]
async fn test_broadcast_to_two_clients() {
    let harness = Harness::start(ServerConfig::default()).await;
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;
    harness.wait_for_consumers(2).await;

    let outcome = harness
        .relay
        .on_upstream_event(TopicEvent::new("sensor/temperature", "23.5"));
    assert_eq!(outcome.delivered, 2);

    let expected = r#"{"topic":"sensor/temperature","value":"23.5"}"#;
    assert_eq!(next_text(&mut a).await, expected);
    assert_eq!(next_text(&mut b).await, expected);
    assert_no_frame(&mut a).await;
    assert_no_frame(&mut b).await;

    harness.stop().await;
}

#[tokio::test]
async fn test_disconnected_client_is_removed() {
    let harness = Harness::start(ServerConfig::default()).await;
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;
    harness.wait_for_consumers(2).await;

    a.close(None).await.unwrap();
    harness.wait_for_consumers(1).await;

    let outcome = harness
        .relay
        .on_upstream_event(TopicEvent::new("sensor/pressure", "1013"));
    assert_eq!(outcome.delivered, 1);
    assert_eq!(outcome.skipped, 0);

    assert_eq!(
        next_text(&mut b).await,
        r#"{"topic":"sensor/pressure","value":"1013"}"#
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_inbound_messages_are_ignored() {
    let harness = Harness::start(ServerConfig::default()).await;
    let mut a = harness.connect().await;
    harness.wait_for_consumers(1).await;

    a.send(Message::text("hello relay")).await.unwrap();
    a.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();

    harness
        .relay
        .on_upstream_event(TopicEvent::new("sensor/latitude", "-33.8688"));

    assert_eq!(
        next_text(&mut a).await,
        r#"{"topic":"sensor/latitude","value":"-33.8688"}"#
    );
    assert_eq!(harness.registry.len(), 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_order_preserved_over_websocket() {
    let harness = Harness::start(ServerConfig::default().outbox_capacity(1024)).await;
    let mut a = harness.connect().await;
    harness.wait_for_consumers(1).await;

    for i in 0..200 {
        harness
            .relay
            .on_upstream_event(TopicEvent::new("sensor/longitude", i.to_string()));
    }

    for i in 0..200 {
        assert_eq!(
            next_text(&mut a).await,
            format!(r#"{{"topic":"sensor/longitude","value":"{}"}}"#, i)
        );
    }

    harness.stop().await;
}

#[tokio::test]
async fn test_registry_clear_closes_clients() {
    let harness = Harness::start(ServerConfig::default()).await;
    let mut a = harness.connect().await;
    harness.wait_for_consumers(1).await;

    assert_eq!(harness.registry.clear(), 1);

    // Server sends a close frame and ends the connection
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match a.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    harness.stop().await;
}

#[tokio::test]
async fn test_connection_limit() {
    let harness = Harness::start(ServerConfig::default().max_connections(1)).await;
    let _a = harness.connect().await;
    harness.wait_for_consumers(1).await;

    // Second client is dropped before the handshake
    let url = format!("ws://{}/", harness.addr);
    assert!(connect_async(url).await.is_err());
    assert_eq!(harness.registry.len(), 1);

    harness.stop().await;
}
