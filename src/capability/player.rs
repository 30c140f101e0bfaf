//! Player engine capability

use std::sync::Arc;

use async_trait::async_trait;
use mopidy_mqtt_wire::{PlaybackState, TrackDescriptor, Volume};
use thiserror::Error;

use super::transport::TransportError;

/// A player command or query that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// The player understood the request and refused it (bad URI, unknown playlist, ...)
    #[error("player rejected request: {0}")]
    Rejected(String),

    /// The player could not be reached
    #[error("player unavailable: {0}")]
    Unavailable(String),

    /// The player answered with something we cannot interpret
    #[error("unexpected player response: {0}")]
    InvalidResponse(String),
}

/// Commands and getters of the player engine.
///
/// Getters always read the player's live state; implementations must not
/// answer them from a cache.
#[async_trait]
pub trait PlayerEngine: Send + Sync {
    async fn play(&self) -> Result<(), PlayerError>;
    async fn stop(&self) -> Result<(), PlayerError>;
    async fn pause(&self) -> Result<(), PlayerError>;
    async fn resume(&self) -> Result<(), PlayerError>;
    async fn previous(&self) -> Result<(), PlayerError>;
    async fn next(&self) -> Result<(), PlayerError>;

    /// Pause when playing, resume when paused, play when stopped.
    async fn toggle_playback(&self) -> Result<(), PlayerError> {
        match self.current_state().await? {
            PlaybackState::Playing => self.pause().await,
            PlaybackState::Paused => self.resume().await,
            PlaybackState::Stopped => self.play().await,
        }
    }

    async fn set_volume(&self, volume: Volume) -> Result<(), PlayerError>;

    /// Shift the volume by `delta`, clamped to `0..=100`.
    async fn adjust_volume(&self, delta: i32) -> Result<(), PlayerError> {
        let current = self.current_volume().await?;
        self.set_volume(current.adjusted(delta as i64)).await
    }

    /// Append a track URI to the play queue.
    async fn enqueue(&self, uri: &str) -> Result<(), PlayerError>;

    /// Replace the play queue with the tracks of a playlist.
    async fn load_playlist(&self, uri: &str) -> Result<(), PlayerError>;

    async fn clear_queue(&self) -> Result<(), PlayerError>;

    /// Search the library, returning the URIs of matching tracks.
    async fn search(&self, query: &str) -> Result<Vec<String>, PlayerError>;

    async fn current_state(&self) -> Result<PlaybackState, PlayerError>;
    async fn current_volume(&self) -> Result<Volume, PlayerError>;
    async fn current_track(&self) -> Result<Option<TrackDescriptor>, PlayerError>;
}

/// Receiver of player state-change notifications.
#[async_trait]
pub trait PlayerListener: Send + Sync {
    async fn on_state_changed(&self, state: PlaybackState) -> Result<(), TransportError>;
    async fn on_volume_changed(&self, volume: Volume) -> Result<(), TransportError>;
    async fn on_track_changed(&self, track: Option<TrackDescriptor>) -> Result<(), TransportError>;
}

/// Handle returned by [`PlayerEvents::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Event-registration side of the player engine.
pub trait PlayerEvents: Send + Sync {
    fn register(&self, listener: Arc<dyn PlayerListener>) -> ListenerId;

    /// Returns false if the id was not registered.
    fn unregister(&self, id: ListenerId) -> bool;
}
