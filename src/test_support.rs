//! Test doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{ApiError, PlaybackApi, PlayerAction};
use crate::auth::tokens::{now_ms, RefreshedToken, TokenSet};
use crate::lyrics::{LyricsQuery, LyricsSource};
use crate::models::{PlaybackSnapshot, PlaybackStats};
use crate::presence::{EventSink, LyricsPayload, PresenceEvent};

#[derive(Default)]
struct FakeApiState {
    refresh_calls: usize,
    now_playing_calls: usize,
    stats_calls: usize,
    exchanges: Vec<(String, String, String)>,
    actions: Vec<(PlayerAction, bool)>,
    refresh_error: Option<String>,
    exchange_error: Option<String>,
    now_playing: Option<PlaybackSnapshot>,
    fail_now_playing: bool,
    now_playing_gate: Option<Arc<Notify>>,
    stats_status: Option<u16>,
}

/// Scriptable provider. Refreshes hand out `refreshed-1`, `refreshed-2`, ...
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeApiState>,
}

impl FakeApi {
    fn lock(&self) -> std::sync::MutexGuard<'_, FakeApiState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn refresh_calls(&self) -> usize {
        self.lock().refresh_calls
    }

    pub fn now_playing_calls(&self) -> usize {
        self.lock().now_playing_calls
    }

    pub fn total_calls(&self) -> usize {
        let s = self.lock();
        s.refresh_calls + s.now_playing_calls + s.stats_calls + s.exchanges.len() + s.actions.len()
    }

    pub fn exchanges(&self) -> Vec<(String, String, String)> {
        self.lock().exchanges.clone()
    }

    pub fn actions(&self) -> Vec<(PlayerAction, bool)> {
        self.lock().actions.clone()
    }

    pub fn fail_refresh(&self, message: &str) {
        self.lock().refresh_error = Some(message.to_string());
    }

    pub fn fail_exchange(&self, message: &str) {
        self.lock().exchange_error = Some(message.to_string());
    }

    pub fn set_now_playing(&self, snapshot: Option<PlaybackSnapshot>) {
        let mut s = self.lock();
        s.now_playing = snapshot;
        s.fail_now_playing = false;
    }

    pub fn fail_now_playing(&self, fail: bool) {
        self.lock().fail_now_playing = fail;
    }

    /// Hold every now-playing call until the returned handle is notified.
    pub fn gate_now_playing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().now_playing_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Make every stats call answer with `status`.
    pub fn fail_stats(&self, status: u16) {
        self.lock().stats_status = Some(status);
    }
}

#[async_trait]
impl PlaybackApi for FakeApi {
    async fn exchange_code(
        &self,
        _client_id: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, ApiError> {
        let mut s = self.lock();
        s.exchanges
            .push((code.to_string(), redirect_uri.to_string(), code_verifier.to_string()));
        if let Some(message) = &s.exchange_error {
            return Err(ApiError::OAuth(message.clone()));
        }
        Ok(TokenSet {
            access_token: format!("access-{}", code),
            refresh_token: "refresh".to_string(),
            expires_at: now_ms() + 3_570_000,
        })
    }

    async fn refresh_access_token(
        &self,
        _client_id: &str,
        _refresh_token: &str,
    ) -> Result<RefreshedToken, ApiError> {
        let mut s = self.lock();
        s.refresh_calls += 1;
        if let Some(message) = &s.refresh_error {
            return Err(ApiError::OAuth(message.clone()));
        }
        Ok(RefreshedToken {
            access_token: format!("refreshed-{}", s.refresh_calls),
            refresh_token: None,
            expires_at: now_ms() + 3_570_000,
        })
    }

    async fn now_playing(&self, _access_token: &str) -> Result<Option<PlaybackSnapshot>, ApiError> {
        let gate = {
            let mut s = self.lock();
            s.now_playing_calls += 1;
            s.now_playing_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let s = self.lock();
        if s.fail_now_playing {
            return Err(ApiError::Http {
                status: 503,
                url: "/me/player/currently-playing".to_string(),
                body: "Service Unavailable".to_string(),
            });
        }
        Ok(s.now_playing.clone())
    }

    async fn player_action(
        &self,
        _access_token: &str,
        action: PlayerAction,
        is_playing: bool,
    ) -> Result<(), ApiError> {
        self.lock().actions.push((action, is_playing));
        Ok(())
    }

    async fn stats(&self, _access_token: &str) -> Result<PlaybackStats, ApiError> {
        let mut s = self.lock();
        s.stats_calls += 1;
        let url = "/me/top/tracks".to_string();
        match s.stats_status {
            None => Ok(PlaybackStats::default()),
            Some(401) => Err(ApiError::Unauthorized { url }),
            Some(403) => Err(ApiError::Forbidden {
                url,
                body: "Insufficient client scope".to_string(),
            }),
            Some(status) => Err(ApiError::Http {
                status,
                url,
                body: String::new(),
            }),
        }
    }
}

/// In-memory lyrics catalogue keyed by `"<track>__<artist>"`.
pub struct FakeSource {
    name: String,
    lyrics: Mutex<HashMap<String, String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    queries: Mutex<Vec<LyricsQuery>>,
    fail: Mutex<bool>,
}

impl FakeSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lyrics: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        }
    }

    pub fn insert(&self, key: &str, text: &str) {
        self.lyrics
            .lock()
            .unwrap()
            .insert(key.to_string(), text.to_string());
    }

    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// Hold fetches for `key` until the returned handle is notified.
    pub fn gate(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<LyricsQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LyricsSource for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        self.queries.lock().unwrap().push(query.clone());
        let key = query.key();

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if *self.fail.lock().unwrap() {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.lyrics.lock().unwrap().get(&key).cloned())
    }
}

/// Records every emitted event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PresenceEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PresenceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn lyrics_events(&self) -> Vec<LyricsPayload> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenceEvent::Lyrics(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn last_lyrics(&self) -> Option<LyricsPayload> {
        self.lyrics_events().pop()
    }

    pub fn last_now_playing(&self) -> Option<Option<PlaybackSnapshot>> {
        self.events().into_iter().rev().find_map(|e| match e {
            PresenceEvent::NowPlaying(snapshot) => Some(snapshot),
            _ => None,
        })
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PresenceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// `{is_playing, item: Song by Artist, 200s}` at progress 0.
pub fn playing_snapshot(is_playing: bool) -> PlaybackSnapshot {
    serde_json::from_value(serde_json::json!({
        "is_playing": is_playing,
        "progress_ms": 0,
        "item": {
            "id": "track-1",
            "name": "Song",
            "duration_ms": 200000,
            "album": {"name": "Album", "images": []},
            "artists": [{"name": "Artist"}]
        }
    }))
    .unwrap()
}
