//! Outbound information messages.

use serde::{Deserialize, Serialize};

use crate::model::{PlaybackState, TrackDescriptor, Volume};
use crate::topic::InfoTopic;

/// Payload published on `trk` when nothing is playing.
pub const EMPTY_TRACK: &str = " ";

const TRACK_SEPARATOR: char = ';';

/// A value to publish under the information root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InfoMessage {
    State(PlaybackState),
    Volume(Volume),
    Track(Option<TrackDescriptor>),
}

impl InfoMessage {
    pub fn topic(&self) -> InfoTopic {
        match self {
            Self::State(_) => InfoTopic::State,
            Self::Volume(_) => InfoTopic::Volume,
            Self::Track(_) => InfoTopic::Track,
        }
    }

    pub fn payload(&self) -> String {
        match self {
            Self::State(state) => state.as_payload().to_string(),
            Self::Volume(volume) => volume.to_string(),
            Self::Track(Some(track)) => encode_track(track),
            Self::Track(None) => EMPTY_TRACK.to_string(),
        }
    }
}

/// Encode a message into its subtopic and payload. Never yields an empty payload.
pub fn encode(message: &InfoMessage) -> (InfoTopic, String) {
    (message.topic(), message.payload())
}

/// `artist;title;album`, or `artist;title;` without an album.
fn encode_track(track: &TrackDescriptor) -> String {
    format!(
        "{artist}{sep}{title}{sep}{album}",
        artist = track.artist,
        title = track.title,
        album = track.album.as_deref().unwrap_or_default(),
        sep = TRACK_SEPARATOR,
    )
}
