//! MQTT transport on rumqttc
//!
//! [`connect`] returns a cloneable [`MqttClient`] implementing
//! [`MqttTransport`], and an [`MqttEventLoop`] that must be driven with
//! [`MqttEventLoop::run`] on its own task.
//!
//! Features:
//! - Handler registry keyed by topic filter, re-subscribed on every ConnAck;
//!   SUBSCRIBE goes out directly only while connected
//! - Inbound messages handed to a single dispatch worker (order preserved,
//!   the event loop never waits on a handler)
//! - Reconnect by re-polling after a fixed delay; rumqttc does the rest

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::mqttbytes::matches as topic_matches;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capability::{MessageHandler, MqttTransport, TransportError};
use crate::config::{ConfigError, MqttConfig};

/// Capacity of the rumqttc request channel
const REQUEST_CAPACITY: usize = 64;

/// Inbound messages buffered for the dispatch worker before dropping
const DISPATCH_QUEUE: usize = 64;

/// Wait before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on flushing the DISCONNECT packet at shutdown
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

struct Subscription {
    filter: String,
    handler: Arc<dyn MessageHandler>,
}

type Registry = Arc<RwLock<Vec<Subscription>>>;

/// Publish/subscribe handle to the broker.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
    subscriptions: Registry,
    connected: Arc<AtomicBool>,
}

/// Connection driver paired with an [`MqttClient`].
pub struct MqttEventLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    qos: QoS,
    subscriptions: Registry,
    connected: Arc<AtomicBool>,
}

/// Build the client and its event loop. No network I/O happens until
/// [`MqttEventLoop::run`] is polled.
pub fn connect(config: &MqttConfig) -> Result<(MqttClient, MqttEventLoop), ConfigError> {
    let qos = config.qos()?;

    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive());
    if let Some((username, password)) = config.credentials() {
        options.set_credentials(username, password);
    }

    let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    let subscriptions: Registry = Arc::new(RwLock::new(Vec::new()));
    let connected = Arc::new(AtomicBool::new(false));

    Ok((
        MqttClient {
            client: client.clone(),
            qos,
            retain: config.retain,
            subscriptions: subscriptions.clone(),
            connected: connected.clone(),
        },
        MqttEventLoop {
            eventloop,
            client,
            qos,
            subscriptions,
            connected,
        },
    ))
}

#[async_trait]
impl MqttTransport for MqttClient {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.client
            .publish(topic, self.qos, self.retain, payload.as_bytes().to_vec())
            .await
            .map_err(|e| TransportError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(
        &self,
        filter: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), TransportError> {
        self.subscriptions.write().await.push(Subscription {
            filter: filter.to_string(),
            handler: handler.clone(),
        });

        // Not connected yet: the next ConnAck subscribes every registered filter
        if !self.connected.load(Ordering::SeqCst) {
            debug!(%filter, "Subscription deferred until connected");
            return Ok(());
        }

        debug!(%filter, "Subscribing");
        if let Err(e) = self.client.subscribe(filter, self.qos).await {
            self.subscriptions.write().await.retain(|subscription| {
                !(subscription.filter == filter && Arc::ptr_eq(&subscription.handler, &handler))
            });
            return Err(TransportError::Subscribe {
                filter: filter.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.subscriptions
            .write()
            .await
            .retain(|subscription| subscription.filter != filter);

        debug!(%filter, "Unsubscribing");
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| TransportError::Unsubscribe {
                filter: filter.to_string(),
                reason: e.to_string(),
            })
    }
}

impl MqttEventLoop {
    /// Drive the connection until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE);
        let worker = tokio::spawn(dispatch_worker(self.subscriptions.clone(), rx));

        info!("MQTT event loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("MQTT event loop shutting down");
                    self.disconnect().await;
                    break;
                }
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("Connected to MQTT broker");
                            self.connected.store(true, Ordering::SeqCst);
                            self.resubscribe().await;
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let message = (publish.topic, publish.payload.to_vec());
                            if let Err(e) = tx.try_send(message) {
                                warn!("Dropping inbound MQTT message: {}", e);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            self.connected.store(false, Ordering::SeqCst);
                            warn!("MQTT connection error: {}", e);
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    }
                }
            }
        }

        // Closing the channel lets the worker finish what is queued and exit
        drop(tx);
        if let Err(e) = worker.await {
            warn!("MQTT dispatch worker failed: {}", e);
        }
        info!("MQTT event loop stopped");
    }

    /// Re-issue every registered subscription after a (re)connect.
    async fn resubscribe(&mut self) {
        let subscriptions = self.subscriptions.read().await;
        for subscription in subscriptions.iter() {
            // try_subscribe: awaiting here would block the loop that drains the request queue
            match self.client.try_subscribe(subscription.filter.as_str(), self.qos) {
                Ok(()) => debug!(filter = %subscription.filter, "Subscribed"),
                Err(e) => warn!(
                    filter = %subscription.filter,
                    "Failed to re-subscribe: {}",
                    e
                ),
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.client.try_disconnect() {
            debug!("MQTT disconnect not sent: {}", e);
            return;
        }

        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            debug!("Timed out flushing MQTT disconnect");
        }
    }
}

/// Handlers whose filter matches `topic`.
async fn handlers_for(subscriptions: &Registry, topic: &str) -> Vec<Arc<dyn MessageHandler>> {
    subscriptions
        .read()
        .await
        .iter()
        .filter(|subscription| topic_matches(topic, &subscription.filter))
        .map(|subscription| subscription.handler.clone())
        .collect()
}

async fn dispatch_worker(subscriptions: Registry, mut rx: mpsc::Receiver<(String, Vec<u8>)>) {
    while let Some((topic, payload)) = rx.recv().await {
        let handlers = handlers_for(&subscriptions, &topic).await;
        if handlers.is_empty() {
            debug!(%topic, "No handler for inbound message");
        }
        for handler in handlers {
            handler.handle(&topic, &payload).await;
        }
    }
}
