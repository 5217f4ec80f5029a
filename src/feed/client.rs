//! MQTT feed client
//!
//! Owns the broker connection in a background task and exposes incoming
//! PUBLISH packets as a [`Stream`] of [`TopicEvent`].

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::config::{FeedConfig, Protocol};
use super::error::UpstreamError;
use super::event::{TopicEvent, UpstreamEvent};

/// Capacity of the status channel
const STATUS_CAPACITY: usize = 64;

/// Receiver for connection status events
pub type UpstreamEvents = mpsc::Receiver<UpstreamEvent>;

/// Connects to the broker and spawns the feed task
pub struct FeedClient;

impl FeedClient {
    /// Start the upstream feed.
    ///
    /// Returns the event stream and a receiver for connection status. The
    /// connection is established lazily by the background task; errors never
    /// abort it, they are reported on the status channel and the task keeps
    /// retrying.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(config: FeedConfig) -> (Feed, UpstreamEvents) {
        let options = mqtt_options(&config);
        let request_capacity = config.topics.len().max(10);
        let (client, eventloop) = AsyncClient::new(options, request_capacity);

        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (status_tx, status_rx) = mpsc::channel(STATUS_CAPACITY);

        tracing::info!(
            broker = %config.broker_addr(),
            protocol = %config.protocol,
            topics = ?config.topics,
            "Starting upstream feed"
        );

        let task = tokio::spawn(run_event_loop(
            eventloop,
            client,
            config.topics,
            config.reconnect_delay,
            event_tx,
            status_tx,
        ));

        (Feed { rx: event_rx, task }, status_rx)
    }
}

/// Lazy, non-restartable sequence of broker messages
///
/// Ends only when the background task stops. Dropping the feed disconnects
/// from the broker.
pub struct Feed {
    rx: mpsc::Receiver<TopicEvent>,
    task: JoinHandle<()>,
}

impl Feed {
    /// Receive the next event
    pub async fn recv(&mut self) -> Option<TopicEvent> {
        self.rx.recv().await
    }
}

impl Stream for Feed {
    type Item = TopicEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn mqtt_options(config: &FeedConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive.max(Duration::from_secs(5)));
    options.set_clean_session(true);

    if let Some(username) = &config.username {
        let password = config.password.clone().unwrap_or_default();
        options.set_credentials(username, password);
    }

    if config.protocol == Protocol::Mqtts {
        options.set_transport(Transport::tls_with_default_config());
    }

    options
}

/// Issue one SUBSCRIBE per topic without waiting for SUBACK
fn subscribe_all(client: &AsyncClient, topics: &[String]) {
    for topic in topics {
        match client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
            Ok(()) => tracing::debug!(topic = %topic, "Subscribe requested"),
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Subscribe request failed"),
        }
    }
}

fn notify(status_tx: &mpsc::Sender<UpstreamEvent>, event: UpstreamEvent) {
    if let Err(mpsc::error::TrySendError::Full(event)) = status_tx.try_send(event) {
        tracing::debug!(?event, "Upstream status channel full, event dropped");
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    topics: Vec<String>,
    reconnect_delay: Duration,
    event_tx: mpsc::Sender<TopicEvent>,
    status_tx: mpsc::Sender<UpstreamEvent>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                // Clean session: the broker forgot our subscriptions
                subscribe_all(&client, &topics);
                notify(
                    &status_tx,
                    UpstreamEvent::Connected {
                        session_present: ack.session_present,
                    },
                );
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let event = TopicEvent::new(publish.topic, publish.payload);
                if event_tx.send(event).await.is_err() {
                    tracing::debug!("Feed dropped, stopping upstream task");
                    return;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                notify(&status_tx, UpstreamEvent::Subscribed { pkid: ack.pkid });
            }
            Ok(_) => {}
            Err(e) => {
                notify(&status_tx, UpstreamEvent::Error(UpstreamError::from(e)));
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}
