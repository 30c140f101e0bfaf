//! Capabilities consumed by the bridge core.
//!
//! The bridge never talks to Mopidy or the broker directly. It is handed
//! implementations of these traits at construction:
//! - [`PlayerEngine`] - player commands and synchronous getters
//! - [`PlayerEvents`] - registration of a [`PlayerListener`] for push events
//! - [`MqttTransport`] - publish, and subscribe with a [`MessageHandler`]

pub mod player;
pub mod transport;

pub use player::*;
pub use transport::*;
