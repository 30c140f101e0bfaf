//! Recording capability doubles for bridge tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mopidy_mqtt_wire::{PlaybackState, TrackDescriptor, Volume};

use crate::capability::{
    ListenerId, MessageHandler, MqttTransport, PlayerEngine, PlayerError, PlayerEvents,
    PlayerListener, TransportError,
};

/// A call received by [`MockPlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Play,
    Stop,
    Pause,
    Resume,
    Previous,
    Next,
    SetVolume(u8),
    Enqueue(String),
    LoadPlaylist(String),
    ClearQueue,
    Search(String),
    CurrentState,
    CurrentVolume,
    CurrentTrack,
}

impl Call {
    fn is_getter(&self) -> bool {
        matches!(self, Self::CurrentState | Self::CurrentVolume | Self::CurrentTrack)
    }
}

#[derive(Default)]
struct PlayerState {
    state: PlaybackState,
    volume: Volume,
    track: Option<TrackDescriptor>,
    calls: Vec<Call>,
    reject: Option<PlayerError>,
}

/// Player that records every call and serves getters from settable live values.
#[derive(Default)]
pub struct MockPlayer {
    inner: Mutex<PlayerState>,
}

impl MockPlayer {
    fn record(&self, call: Call) -> Result<(), PlayerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        match &inner.reject {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Every call, getters included.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls that change player state.
    pub fn commands(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| !c.is_getter()).collect()
    }

    pub fn reject_with(&self, error: PlayerError) {
        self.inner.lock().unwrap().reject = Some(error);
    }

    pub fn accept_all(&self) {
        self.inner.lock().unwrap().reject = None;
    }

    pub fn set_live_state(&self, state: PlaybackState) {
        self.inner.lock().unwrap().state = state;
    }

    pub fn set_live_volume(&self, volume: Volume) {
        self.inner.lock().unwrap().volume = volume;
    }

    pub fn set_live_track(&self, track: Option<TrackDescriptor>) {
        self.inner.lock().unwrap().track = track;
    }

    pub fn live_volume(&self) -> Volume {
        self.inner.lock().unwrap().volume
    }
}

#[async_trait]
impl PlayerEngine for MockPlayer {
    async fn play(&self) -> Result<(), PlayerError> {
        self.record(Call::Play)
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        self.record(Call::Stop)
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.record(Call::Pause)
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        self.record(Call::Resume)
    }

    async fn previous(&self) -> Result<(), PlayerError> {
        self.record(Call::Previous)
    }

    async fn next(&self) -> Result<(), PlayerError> {
        self.record(Call::Next)
    }

    async fn set_volume(&self, volume: Volume) -> Result<(), PlayerError> {
        self.record(Call::SetVolume(volume.value()))?;
        self.set_live_volume(volume);
        Ok(())
    }

    async fn enqueue(&self, uri: &str) -> Result<(), PlayerError> {
        self.record(Call::Enqueue(uri.to_string()))
    }

    async fn load_playlist(&self, uri: &str) -> Result<(), PlayerError> {
        self.record(Call::LoadPlaylist(uri.to_string()))
    }

    async fn clear_queue(&self) -> Result<(), PlayerError> {
        self.record(Call::ClearQueue)
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, PlayerError> {
        self.record(Call::Search(query.to_string()))?;
        Ok(vec![format!("local:track:{query}")])
    }

    async fn current_state(&self) -> Result<PlaybackState, PlayerError> {
        self.record(Call::CurrentState)?;
        Ok(self.inner.lock().unwrap().state)
    }

    async fn current_volume(&self) -> Result<Volume, PlayerError> {
        self.record(Call::CurrentVolume)?;
        Ok(self.live_volume())
    }

    async fn current_track(&self) -> Result<Option<TrackDescriptor>, PlayerError> {
        self.record(Call::CurrentTrack)?;
        Ok(self.inner.lock().unwrap().track.clone())
    }
}

/// Event source that lets tests fire player events by hand.
#[derive(Default)]
pub struct MockEvents {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, Arc<dyn PlayerListener>>>,
}

impl MockEvents {
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn PlayerListener>> {
        self.listeners.lock().unwrap().values().cloned().collect()
    }

    pub async fn emit_state(&self, state: PlaybackState) {
        for listener in self.snapshot() {
            let _ = listener.on_state_changed(state).await;
        }
    }

    pub async fn emit_volume(&self, volume: Volume) {
        for listener in self.snapshot() {
            let _ = listener.on_volume_changed(volume).await;
        }
    }
}

impl PlayerEvents for MockEvents {
    fn register(&self, listener: Arc<dyn PlayerListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().unwrap().insert(id, listener);
        id
    }

    fn unregister(&self, id: ListenerId) -> bool {
        self.listeners.lock().unwrap().remove(&id).is_some()
    }
}

/// Transport that records publishes and lets tests deliver inbound messages.
#[derive(Default)]
pub struct MockTransport {
    published: Mutex<Vec<(String, String)>>,
    subscriptions: Mutex<Vec<(String, Arc<dyn MessageHandler>)>>,
    fail_publish: AtomicBool,
}

impl MockTransport {
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn fail_publishes(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    pub fn filters(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|(filter, _)| filter.clone())
            .collect()
    }

    /// Deliver a message to every handler whose filter matches.
    pub async fn deliver(&self, topic: &str, payload: &[u8]) {
        let handlers: Vec<_> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(filter, _)| filter_matches(filter, topic))
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler.handle(topic, payload).await;
        }
    }
}

/// Single-level wildcard matching, enough for the bridge's one filter.
fn filter_matches(filter: &str, topic: &str) -> bool {
    let filter: Vec<_> = filter.split('/').collect();
    let topic: Vec<_> = topic.split('/').collect();
    filter.len() == topic.len()
        && filter
            .iter()
            .zip(&topic)
            .all(|(f, t)| *f == "+" || f == t)
}

#[async_trait]
impl MqttTransport for MockTransport {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                topic: topic.to_string(),
                reason: "broker unreachable".to_string(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    async fn subscribe(
        &self,
        filter: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), TransportError> {
        self.subscriptions
            .lock()
            .unwrap()
            .push((filter.to_string(), handler));
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.subscriptions
            .lock()
            .unwrap()
            .retain(|(f, _)| f != filter);
        Ok(())
    }
}
