//! Mopidy MQTT
//!
//! A bridge between a Mopidy music server and an MQTT broker.
//!
//! This library provides:
//! - Player state published under `<prefix>/i` (state, volume, track)
//! - Player control subscribed under `<prefix>/c` (playback, volume, queue, search, info)
//! - Capability traits so the bridge core runs against any player or broker
//! - Mopidy JSON-RPC and rumqttc implementations of those capabilities

// =============================================================================
// Lints - Enforce code quality and consistency
// =============================================================================

// Deny truly dangerous patterns (these will fail the build)
#![deny(unsafe_code)]
#![deny(unused_must_use)]

// Bridge core (transport and player agnostic)
pub mod bridge;
pub mod capability;

// Server-only modules (concrete backends)
#[cfg(feature = "server")]
pub mod adapters;
#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod mqtt;

pub use bridge::{Bridge, BridgeError, BridgeSettings, CommandDispatcher, StatePublisher};
pub use mopidy_mqtt_wire as wire;
