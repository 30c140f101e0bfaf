//! Mopidy HTTP JSON-RPC adapter
//!
//! Implements the player capabilities against Mopidy's HTTP frontend.
//! Documentation: https://docs.mopidy.com/stable/api/http/
//!
//! Player events are produced by polling: each tick reads state, volume,
//! current track and stream title, and notifies registered listeners of what
//! changed. A stream title (radio) replaces the track title while it is set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use mopidy_mqtt_wire::{PlaybackState, TrackDescriptor, Volume};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capability::{ListenerId, PlayerEngine, PlayerError, PlayerEvents, PlayerListener};
use crate::config::MopidyConfig;

/// Request ID for Mopidy JSON-RPC calls
const MOPIDY_REQUEST_ID: i32 = 217;

/// Timeout for a single JSON-RPC request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC transport to Mopidy
struct MopidyRpc {
    client: Client,
    url: String,
    credentials: Option<(String, String)>,
}

impl MopidyRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, PlayerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": MOPIDY_REQUEST_ID,
            "method": method,
            "params": params,
        });

        debug!(method, params = ?body["params"], "Mopidy request");

        let mut request = self.client.post(&self.url).json(&body);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PlayerError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlayerError::Unavailable(format!(
                "Mopidy request failed: {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| PlayerError::InvalidResponse(e.to_string()))?;

        debug!(method, result = ?data.get("result"), "Mopidy response");

        parse_rpc_response(data)
    }

    /// Call a method whose result is not needed.
    async fn command(&self, method: &str, params: Value) -> Result<(), PlayerError> {
        self.call(method, params).await.map(|_| ())
    }

    async fn state(&self) -> Result<PlaybackState, PlayerError> {
        let result = self.call("core.playback.get_state", json!({})).await?;
        serde_json::from_value(result).map_err(|e| PlayerError::InvalidResponse(e.to_string()))
    }

    /// `None` when Mopidy has no mixer.
    async fn volume(&self) -> Result<Option<Volume>, PlayerError> {
        let result = self.call("core.mixer.get_volume", json!({})).await?;
        serde_json::from_value(result).map_err(|e| PlayerError::InvalidResponse(e.to_string()))
    }

    async fn track(&self) -> Result<Option<TrackDescriptor>, PlayerError> {
        let result = self
            .call("core.playback.get_current_track", json!({}))
            .await?;
        let track: Option<MopidyTrack> = serde_json::from_value(result)
            .map_err(|e| PlayerError::InvalidResponse(e.to_string()))?;
        Ok(track.map(TrackDescriptor::from))
    }

    /// Title announced by the current stream, `None` when absent or blank.
    async fn stream_title(&self) -> Result<Option<String>, PlayerError> {
        let result = self
            .call("core.playback.get_stream_title", json!({}))
            .await?;
        let title: Option<String> = serde_json::from_value(result)
            .map_err(|e| PlayerError::InvalidResponse(e.to_string()))?;
        Ok(title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty()))
    }

    async fn add_uris(&self, uris: &[String]) -> Result<usize, PlayerError> {
        let result = self
            .call("core.tracklist.add", json!({ "uris": uris }))
            .await?;
        Ok(result.as_array().map(Vec::len).unwrap_or(0))
    }
}

/// Unwrap a JSON-RPC response envelope.
fn parse_rpc_response(data: Value) -> Result<Value, PlayerError> {
    if let Some(error) = data.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let detail = error.pointer("/data/message").and_then(Value::as_str);
        return Err(PlayerError::Rejected(match detail {
            Some(detail) => format!("{}: {}", message, detail),
            None => message.to_string(),
        }));
    }

    Ok(data.get("result").cloned().unwrap_or(Value::Null))
}

#[derive(Debug, Deserialize)]
struct MopidyTrack {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<MopidyNamed>,
    #[serde(default)]
    album: Option<MopidyNamed>,
}

#[derive(Debug, Deserialize)]
struct MopidyNamed {
    #[serde(default)]
    name: Option<String>,
}

/// Anything Mopidy identifies by URI (Ref, Track)
#[derive(Debug, Deserialize)]
struct MopidyRef {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct MopidySearchResult {
    #[serde(default)]
    tracks: Vec<MopidyRef>,
}

impl From<MopidyTrack> for TrackDescriptor {
    fn from(track: MopidyTrack) -> Self {
        let artist = track
            .artists
            .into_iter()
            .filter_map(|artist| artist.name)
            .collect::<Vec<_>>()
            .join(", ");
        let album = track
            .album
            .and_then(|album| album.name)
            .filter(|name| !name.is_empty());

        TrackDescriptor {
            artist,
            title: track.name.unwrap_or_default(),
            album,
        }
    }
}

/// What is playing: the current track, retitled by the stream title if any.
fn now_playing(
    track: Option<TrackDescriptor>,
    stream_title: Option<&str>,
) -> Option<TrackDescriptor> {
    match (track, stream_title) {
        (track, Some(title)) => {
            let mut track = track.unwrap_or_else(|| TrackDescriptor::new("", ""));
            track.title = title.to_string();
            Some(track)
        }
        (track, None) => track,
    }
}

/// State read by one poll
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    state: PlaybackState,
    volume: Option<Volume>,
    track: Option<TrackDescriptor>,
    stream_title: Option<String>,
}

impl Snapshot {
    fn now_playing(&self) -> Option<TrackDescriptor> {
        now_playing(self.track.clone(), self.stream_title.as_deref())
    }
}

/// A change detected between two snapshots
#[derive(Debug, Clone, PartialEq)]
enum Change {
    State(PlaybackState),
    Volume(Volume),
    Track(Option<TrackDescriptor>),
}

/// What changed from `previous` to `current`. Everything counts as changed
/// on the first poll; a volume that disappears is not reported.
fn changes(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Change> {
    let mut changes = Vec::new();

    if previous.map(|p| p.state) != Some(current.state) {
        changes.push(Change::State(current.state));
    }
    if let Some(volume) = current.volume {
        if previous.and_then(|p| p.volume) != Some(volume) {
            changes.push(Change::Volume(volume));
        }
    }
    let track = current.now_playing();
    if previous.map(Snapshot::now_playing).as_ref() != Some(&track) {
        changes.push(Change::Track(track));
    }

    changes
}

/// Mopidy player engine and event source.
pub struct MopidyAdapter {
    rpc: MopidyRpc,
    poll_interval: Duration,
    listeners: RwLock<HashMap<ListenerId, Arc<dyn PlayerListener>>>,
    next_listener: AtomicU64,
    last: Mutex<Option<Snapshot>>,
}

impl MopidyAdapter {
    pub fn new(config: &MopidyConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to build HTTP client with custom config: {}. Using default.",
                    e
                );
                Client::default()
            });

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Self {
            rpc: MopidyRpc {
                client,
                url: config.rpc_url(),
                credentials,
            },
            poll_interval: config.poll_interval(),
            listeners: RwLock::new(HashMap::new()),
            next_listener: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    /// Start the polling task. It runs until `shutdown` is cancelled.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let adapter = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(adapter.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(url = %adapter.rpc.url, "Mopidy polling started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Mopidy polling shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = adapter.poll().await {
                            warn!("Failed to poll Mopidy: {}", e);
                        }
                    }
                }
            }

            info!("Mopidy polling stopped");
        })
    }

    /// Read current state once and notify listeners of any change.
    pub async fn poll(&self) -> Result<(), PlayerError> {
        let current = Snapshot {
            state: self.rpc.state().await?,
            volume: self.rpc.volume().await?,
            track: self.rpc.track().await?,
            stream_title: self.rpc.stream_title().await?,
        };

        let changes = {
            let mut last = self.last.lock().await;
            let changes = changes(last.as_ref(), &current);
            *last = Some(current);
            changes
        };

        for change in changes {
            self.notify(change).await;
        }
        Ok(())
    }

    async fn notify(&self, change: Change) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        debug!(?change, listeners = listeners.len(), "Mopidy state changed");

        for listener in listeners {
            let result = match &change {
                Change::State(state) => listener.on_state_changed(*state).await,
                Change::Volume(volume) => listener.on_volume_changed(*volume).await,
                Change::Track(track) => listener.on_track_changed(track.clone()).await,
            };
            if let Err(e) = result {
                error!("Player listener failed: {}", e);
            }
        }
    }
}

impl PlayerEvents for MopidyAdapter {
    fn register(&self, listener: Arc<dyn PlayerListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        id
    }

    fn unregister(&self, id: ListenerId) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }
}

#[async_trait]
impl PlayerEngine for MopidyAdapter {
    async fn play(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.playback.play", json!({})).await
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.playback.stop", json!({})).await
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.playback.pause", json!({})).await
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.playback.resume", json!({})).await
    }

    async fn previous(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.playback.previous", json!({})).await
    }

    async fn next(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.playback.next", json!({})).await
    }

    async fn set_volume(&self, volume: Volume) -> Result<(), PlayerError> {
        let accepted = self
            .rpc
            .call("core.mixer.set_volume", json!({ "volume": volume.value() }))
            .await?;
        if accepted.as_bool() == Some(false) {
            return Err(PlayerError::Rejected(format!(
                "mixer refused volume {}",
                volume
            )));
        }
        Ok(())
    }

    async fn enqueue(&self, uri: &str) -> Result<(), PlayerError> {
        let added = self.rpc.add_uris(&[uri.to_string()]).await?;
        if added == 0 {
            return Err(PlayerError::Rejected(format!("no tracks found for {}", uri)));
        }
        debug!(uri, added, "Enqueued tracks");
        Ok(())
    }

    async fn load_playlist(&self, uri: &str) -> Result<(), PlayerError> {
        // Resolve first so an unknown playlist leaves the queue untouched
        let items = self
            .rpc
            .call("core.playlists.get_items", json!({ "uri": uri }))
            .await?;
        let items: Option<Vec<MopidyRef>> = serde_json::from_value(items)
            .map_err(|e| PlayerError::InvalidResponse(e.to_string()))?;
        let Some(items) = items else {
            return Err(PlayerError::Rejected(format!("playlist not found: {}", uri)));
        };

        let uris: Vec<String> = items.into_iter().map(|item| item.uri).collect();

        self.rpc.command("core.tracklist.clear", json!({})).await?;
        if uris.is_empty() {
            info!(uri, "Loaded empty playlist");
            return Ok(());
        }

        let added = self.rpc.add_uris(&uris).await?;
        info!(uri, added, "Loaded playlist");
        Ok(())
    }

    async fn clear_queue(&self) -> Result<(), PlayerError> {
        self.rpc.command("core.tracklist.clear", json!({})).await
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, PlayerError> {
        let result = self
            .rpc
            .call("core.library.search", json!({ "query": { "any": [query] } }))
            .await?;
        let results: Vec<MopidySearchResult> = serde_json::from_value(result)
            .map_err(|e| PlayerError::InvalidResponse(e.to_string()))?;

        Ok(results
            .into_iter()
            .flat_map(|result| result.tracks)
            .map(|track| track.uri)
            .collect())
    }

    async fn current_state(&self) -> Result<PlaybackState, PlayerError> {
        self.rpc.state().await
    }

    async fn current_volume(&self) -> Result<Volume, PlayerError> {
        self.rpc
            .volume()
            .await?
            .ok_or_else(|| PlayerError::InvalidResponse("Mopidy has no mixer volume".to_string()))
    }

    async fn current_track(&self) -> Result<Option<TrackDescriptor>, PlayerError> {
        let track = self.rpc.track().await?;
        let stream_title = self.rpc.stream_title().await?;
        Ok(now_playing(track, stream_title.as_deref()))
    }
}
