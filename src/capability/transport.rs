//! MQTT transport capability

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the MQTT transport. Not retried by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscribe to {filter} failed: {reason}")]
    Subscribe { filter: String, reason: String },

    #[error("unsubscribe from {filter} failed: {reason}")]
    Unsubscribe { filter: String, reason: String },
}

/// Receives messages for a subscribed topic filter.
///
/// Handlers return nothing: a bad inbound message is the handler's problem,
/// never the transport's.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, topic: &str, payload: &[u8]);
}

/// Broker access.
#[async_trait]
pub trait MqttTransport: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    async fn subscribe(
        &self,
        filter: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), TransportError>;

    async fn unsubscribe(&self, filter: &str) -> Result<(), TransportError>;
}
