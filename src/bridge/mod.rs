//! Bridge Controller
//!
//! Wires the [`StatePublisher`] to the player's event source and the
//! [`CommandDispatcher`] to the broker's control subscription. Holds no
//! state of its own besides the topic prefix; it is built once at startup
//! and torn down once at shutdown.
//!
//! ```text
//! player event ──► StatePublisher ──► publish(<prefix>/i/<sub>, payload)
//! <prefix>/c/<sub> ──► CommandDispatcher ──► PlayerEngine call
//! ```

pub mod dispatcher;
pub mod publisher;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use mopidy_mqtt_wire::TopicPrefix;
use thiserror::Error;
use tracing::{info, warn};

use crate::capability::{
    ListenerId, MqttTransport, PlayerEngine, PlayerError, PlayerEvents, TransportError,
};

pub use dispatcher::CommandDispatcher;
pub use publisher::StatePublisher;

/// Failure executing a decoded command.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Immutable settings the controller is constructed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeSettings {
    pub topic_prefix: TopicPrefix,
}

/// Running bridge between a player and a broker.
pub struct Bridge {
    settings: BridgeSettings,
    publisher: Arc<StatePublisher>,
    dispatcher: Arc<CommandDispatcher>,
    events: Arc<dyn PlayerEvents>,
    transport: Arc<dyn MqttTransport>,
    listener: ListenerId,
    control_filter: String,
}

impl Bridge {
    /// Register the publisher for player events and subscribe the dispatcher
    /// to `<prefix>/c/+`.
    ///
    /// If the subscription fails the listener registration is rolled back.
    pub async fn start(
        settings: BridgeSettings,
        player: Arc<dyn PlayerEngine>,
        events: Arc<dyn PlayerEvents>,
        transport: Arc<dyn MqttTransport>,
    ) -> Result<Self, TransportError> {
        let prefix = settings.topic_prefix.clone();
        let publisher = Arc::new(StatePublisher::new(
            prefix.clone(),
            player.clone(),
            transport.clone(),
        ));
        let dispatcher = Arc::new(CommandDispatcher::new(
            prefix.clone(),
            player,
            publisher.clone(),
        ));

        let listener = events.register(publisher.clone());

        let control_filter = prefix.control_filter();
        if let Err(e) = transport
            .subscribe(&control_filter, dispatcher.clone())
            .await
        {
            events.unregister(listener);
            return Err(e);
        }

        info!(prefix = %prefix, filter = %control_filter, "MQTT bridge started");

        Ok(Self {
            settings,
            publisher,
            dispatcher,
            events,
            transport,
            listener,
            control_filter,
        })
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn publisher(&self) -> &Arc<StatePublisher> {
        &self.publisher
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Unregister from player events and drop the control subscription.
    pub async fn shutdown(self) {
        if !self.events.unregister(self.listener) {
            warn!("Bridge listener was already unregistered");
        }
        if let Err(e) = self.transport.unsubscribe(&self.control_filter).await {
            warn!("Failed to unsubscribe control topics: {}", e);
        }
        info!(prefix = %self.settings.topic_prefix, "MQTT bridge stopped");
    }
}
