//! The presence engine
//!
//! One explicit object owns the token lifecycle, the poll loop, the lyrics
//! resolver and the presentation glue. It is built once per process and
//! shared as `Arc<Engine>`.

mod commands;
mod policy;
mod poller;

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub use commands::EngineStatus;
pub use policy::{PollTimings, PollingPolicy};

use crate::api::{ApiError, PlaybackApi};
use crate::auth::{AuthConfig, CallbackServer, TokenManager};
use crate::config::{CredentialStore, Settings};
use crate::lyrics::{LyricsResolver, LyricsSource};
use crate::models::PlaybackSnapshot;
use crate::presence::{Coordinator, EventSink, ForegroundProbe, FullscreenWatcher, WindowLayer};

/// User-facing failures of inbound commands
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not connected. Run `login` first.")]
    NotConnected,

    #[error("Client ID is required. Set it with `client-id <ID>`.")]
    MissingClientId,

    #[error("Stats permission missing. Log out and connect again to grant it.")]
    StatsPermissionDenied,

    #[error("Stats could not be loaded: {0}")]
    StatsUnavailable(#[source] ApiError),

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error("Could not start the callback receiver on port {port}: {source}")]
    CallbackServer {
        port: u16,
        #[source]
        source: warp::Error,
    },

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Collaborators handed to [`Engine::new`].
pub struct EngineDeps {
    pub settings: Settings,
    pub auth: AuthConfig,
    pub store: Arc<dyn CredentialStore>,
    pub api: Arc<dyn PlaybackApi>,
    pub windows: Arc<dyn WindowLayer>,
    pub sink: Arc<dyn EventSink>,
    pub probe: Arc<dyn ForegroundProbe>,
    pub lyrics_sources: Vec<Arc<dyn LyricsSource>>,
}

pub struct Engine {
    this: Weak<Engine>,
    settings: Settings,
    auth: AuthConfig,
    timings: PollTimings,
    store: Arc<dyn CredentialStore>,
    api: Arc<dyn PlaybackApi>,
    sink: Arc<dyn EventSink>,
    tokens: TokenManager,
    coordinator: Arc<Coordinator>,
    fullscreen: FullscreenWatcher,
    lyrics: Arc<LyricsResolver>,
    policy: Mutex<PollingPolicy>,
    wake: Notify,
    last_snapshot: Mutex<Option<PlaybackSnapshot>>,
    lyrics_task: Mutex<Option<JoinHandle<()>>>,
    callback_server: tokio::sync::Mutex<Option<CallbackServer>>,
}

impl Engine {
    pub fn new(deps: EngineDeps) -> Arc<Self> {
        let coordinator = Arc::new(Coordinator::new(deps.store.clone(), deps.windows));
        let fullscreen = FullscreenWatcher::new(
            deps.probe,
            coordinator.clone(),
            Duration::from_millis(deps.settings.fullscreen.probe_interval_ms),
            deps.settings.fullscreen.ratio,
        );
        let lyrics = Arc::new(LyricsResolver::new(
            deps.lyrics_sources,
            deps.sink.clone(),
            deps.settings.lyrics_cache_capacity,
        ));

        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            timings: PollTimings::from(&deps.settings.polling),
            settings: deps.settings,
            auth: deps.auth,
            tokens: TokenManager::new(deps.store.clone(), deps.api.clone()),
            store: deps.store,
            api: deps.api,
            sink: deps.sink,
            coordinator,
            fullscreen,
            lyrics,
            policy: Mutex::new(PollingPolicy::default()),
            wake: Notify::new(),
            last_snapshot: Mutex::new(None),
            lyrics_task: Mutex::new(None),
            callback_server: tokio::sync::Mutex::new(None),
        })
    }

    /// Latest snapshot from a successful poll.
    pub fn last_snapshot(&self) -> Option<PlaybackSnapshot> {
        self.last_snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_last_snapshot(&self, snapshot: Option<PlaybackSnapshot>) {
        *self.last_snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    fn policy(&self) -> std::sync::MutexGuard<'_, PollingPolicy> {
        self.policy.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve lyrics for `snapshot` off the poll path.
    fn spawn_lyrics_update(&self, snapshot: Option<PlaybackSnapshot>) {
        let lyrics = Arc::clone(&self.lyrics);
        let handle = tokio::spawn(async move {
            lyrics.update_for(snapshot.as_ref()).await;
        });
        *self.lyrics_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Wait for the most recent lyrics update to finish.
    #[cfg(test)]
    pub(crate) async fn settle_lyrics(&self) {
        let handle = self
            .lyrics_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
