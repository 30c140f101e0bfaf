//! Command Dispatcher - inbound broker messages to player commands

use std::sync::Arc;

use async_trait::async_trait;
use mopidy_mqtt_wire::{decode, ControlCommand, DecodeError, TopicPrefix};
use tracing::{debug, info, warn};

use super::publisher::StatePublisher;
use super::BridgeError;
use crate::capability::{MessageHandler, PlayerEngine};

/// Turns `<prefix>/c/<subtopic>` messages into player calls.
///
/// Every valid message results in exactly one player call (or one snapshot
/// publish for `inf`). Invalid messages result in none. Nothing is retried
/// and no failure escapes [`CommandDispatcher::handle_message`].
pub struct CommandDispatcher {
    prefix: TopicPrefix,
    player: Arc<dyn PlayerEngine>,
    publisher: Arc<StatePublisher>,
}

impl CommandDispatcher {
    pub fn new(
        prefix: TopicPrefix,
        player: Arc<dyn PlayerEngine>,
        publisher: Arc<StatePublisher>,
    ) -> Self {
        Self {
            prefix,
            player,
            publisher,
        }
    }

    /// Decode a raw message into a command.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<ControlCommand, DecodeError> {
        let subtopic = self.prefix.parse_control(topic)?;
        decode(subtopic, payload)
    }

    /// Decode and execute one inbound message, logging any failure.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let command = match self.decode(topic, payload) {
            Ok(command) => command,
            Err(e @ (DecodeError::UnknownSubtopic(_) | DecodeError::OutsideControlRoot(_))) => {
                debug!(%topic, "Ignoring message: {}", e);
                return;
            }
            Err(e) => {
                warn!(
                    %topic,
                    payload = %String::from_utf8_lossy(payload),
                    "Dropping control message: {}",
                    e
                );
                return;
            }
        };

        debug!(%topic, command = command.name(), "Dispatching control command");

        if let Err(e) = self.execute(command.clone()).await {
            warn!(command = command.name(), "Control command failed: {}", e);
        }
    }

    /// Run a decoded command against the player.
    pub async fn execute(&self, command: ControlCommand) -> Result<(), BridgeError> {
        match command {
            ControlCommand::Play => self.player.play().await?,
            ControlCommand::Stop => self.player.stop().await?,
            ControlCommand::Pause => self.player.pause().await?,
            ControlCommand::Resume => self.player.resume().await?,
            ControlCommand::Toggle => self.player.toggle_playback().await?,
            ControlCommand::Previous => self.player.previous().await?,
            ControlCommand::Next => self.player.next().await?,
            ControlCommand::SetVolume(volume) => self.player.set_volume(volume).await?,
            ControlCommand::AdjustVolume(delta) => self.player.adjust_volume(delta).await?,
            ControlCommand::Enqueue(uri) => self.player.enqueue(&uri).await?,
            ControlCommand::LoadPlaylist(uri) => self.player.load_playlist(&uri).await?,
            ControlCommand::ClearQueue => self.player.clear_queue().await?,
            ControlCommand::Search(query) => {
                let found = self.player.search(&query).await?;
                info!(%query, results = found.len(), "Library search completed");
            }
            ControlCommand::InfoRequest(kind) => self.publisher.publish_snapshot(kind).await?,
        }
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for CommandDispatcher {
    async fn handle(&self, topic: &str, payload: &[u8]) {
        self.handle_message(topic, payload).await;
    }
}
