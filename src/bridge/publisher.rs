//! State Publisher - player events to broker publishes

use std::sync::Arc;

use async_trait::async_trait;
use mopidy_mqtt_wire::{
    encode, InfoKind, InfoMessage, PlaybackState, TopicPrefix, TrackDescriptor, Volume,
};
use tracing::debug;

use super::BridgeError;
use crate::capability::{MqttTransport, PlayerEngine, PlayerListener, TransportError};

/// Publishes player state under `<prefix>/i`.
///
/// One event produces exactly one publish. Nothing is cached, batched or
/// deduplicated.
pub struct StatePublisher {
    prefix: TopicPrefix,
    player: Arc<dyn PlayerEngine>,
    transport: Arc<dyn MqttTransport>,
}

impl StatePublisher {
    pub fn new(
        prefix: TopicPrefix,
        player: Arc<dyn PlayerEngine>,
        transport: Arc<dyn MqttTransport>,
    ) -> Self {
        Self {
            prefix,
            player,
            transport,
        }
    }

    /// Encode and publish a single message.
    pub async fn publish(&self, message: &InfoMessage) -> Result<(), TransportError> {
        let (subtopic, payload) = encode(message);
        let topic = self.prefix.info_topic(subtopic);
        debug!(%topic, %payload, "Publishing player info");
        self.transport.publish(&topic, &payload).await
    }

    /// Read the requested value from the player and publish it immediately.
    ///
    /// `Queue` publishes the current track on `trk`.
    pub async fn publish_snapshot(&self, kind: InfoKind) -> Result<(), BridgeError> {
        let message = match kind {
            InfoKind::State => InfoMessage::State(self.player.current_state().await?),
            InfoKind::Volume => InfoMessage::Volume(self.player.current_volume().await?),
            InfoKind::Queue => InfoMessage::Track(self.player.current_track().await?),
        };
        self.publish(&message).await?;
        Ok(())
    }
}

#[async_trait]
impl PlayerListener for StatePublisher {
    async fn on_state_changed(&self, state: PlaybackState) -> Result<(), TransportError> {
        self.publish(&InfoMessage::State(state)).await
    }

    async fn on_volume_changed(&self, volume: Volume) -> Result<(), TransportError> {
        self.publish(&InfoMessage::Volume(volume)).await
    }

    async fn on_track_changed(&self, track: Option<TrackDescriptor>) -> Result<(), TransportError> {
        self.publish(&InfoMessage::Track(track)).await
    }
}
