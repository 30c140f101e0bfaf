//! Player domain values carried over the bridge.

use serde::{Deserialize, Serialize};

/// Playback state as reported by the player.
///
/// Deserializes from Mopidy's JSON names (`playing`, `paused`, `stopped`).
/// The MQTT payload form is produced by [`PlaybackState::as_payload`], which
/// uses `stop` rather than `stopped`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackState {
    /// Payload published on the `sta` subtopic.
    pub fn as_payload(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stop",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Mixer volume, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "i64", into = "u8")]
pub struct Volume(u8);

impl Volume {
    pub const MIN: Volume = Volume(0);
    pub const MAX: Volume = Volume(100);

    /// Build a volume from any integer, clamping into `0..=100`.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN.0 as i64, Self::MAX.0 as i64) as u8)
    }

    /// Apply a signed delta, clamping the result.
    pub fn adjusted(self, delta: i64) -> Self {
        Self::clamped((self.0 as i64).saturating_add(delta))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<i64> for Volume {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Volume> for u8 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currently playing track.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
}

impl TrackDescriptor {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps_out_of_range() {
        assert_eq!(Volume::clamped(-20).value(), 0);
        assert_eq!(Volume::clamped(55).value(), 55);
        assert_eq!(Volume::clamped(250).value(), 100);
        assert_eq!(Volume::clamped(i64::MAX), Volume::MAX);
    }

    #[test]
    fn test_volume_adjustment_clamps() {
        for start in [0, 1, 50, 95, 100] {
            for delta in [-200, -10, -1, 0, 1, 10, 200] {
                let expected = (start as i64 + delta).clamp(0, 100);
                assert_eq!(
                    Volume::clamped(start).adjusted(delta).value() as i64,
                    expected,
                    "start={start} delta={delta}"
                );
            }
        }
        assert_eq!(Volume::MAX.adjusted(i64::MAX), Volume::MAX);
        assert_eq!(Volume::MIN.adjusted(i64::MIN), Volume::MIN);
    }

    #[test]
    fn test_playback_state_from_mopidy_json() {
        let state: PlaybackState = serde_json::from_str("\"playing\"").unwrap();
        assert_eq!(state, PlaybackState::Playing);
        let state: PlaybackState = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(state, PlaybackState::Stopped);
        assert!(serde_json::from_str::<PlaybackState>("\"stop\"").is_err());
    }

    #[test]
    fn test_playback_state_payload_differs_from_display() {
        assert_eq!(PlaybackState::Stopped.as_payload(), "stop");
        assert_eq!(PlaybackState::Stopped.to_string(), "stopped");
        assert_eq!(PlaybackState::Paused.as_payload(), "paused");
    }

    #[test]
    fn test_volume_deserializes_with_clamping() {
        let volume: Volume = serde_json::from_str("130").unwrap();
        assert_eq!(volume, Volume::MAX);
        assert_eq!(serde_json::to_string(&Volume::clamped(42)).unwrap(), "42");
    }
}
