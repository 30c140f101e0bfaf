//! Wire types for the Mopidy MQTT bridge.
//!
//! This crate is the Topic Codec: pure functions mapping between player
//! domain values and MQTT topic/payload pairs. It performs no I/O.
//!
//! # Modules
//! - [`model`] - Playback state, volume and track types
//! - [`topic`] - Topic prefix and the control/information subtopics
//! - [`command`] - Inbound control commands and their decoding
//! - [`info`] - Outbound information messages and their encoding
//! - [`error`] - Decode and topic errors

pub mod command;
pub mod error;
pub mod info;
pub mod model;
pub mod topic;

// Re-export commonly used types at crate root
pub use command::{decode, ControlCommand, InfoKind};
pub use error::{DecodeError, TopicError};
pub use info::{encode, InfoMessage, EMPTY_TRACK};
pub use model::{PlaybackState, TrackDescriptor, Volume};
pub use topic::{ControlTopic, InfoTopic, Root, TopicPrefix, DEFAULT_PREFIX};
