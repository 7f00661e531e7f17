//! Inbound commands from the presentation layer

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use super::{Engine, EngineError};
use crate::api::PlayerAction;
use crate::auth::pkce::stored_redirect_port;
use crate::auth::tokens::{clear_token_set, load_token_set, now_ms, save_token_set};
use crate::auth::{
    oauth, AuthConfig, CallbackError, CallbackHandler, CallbackServer, OAuthTransaction,
    RefreshDiagnostics,
};
use crate::config::keys;
use crate::lyrics::Resolution;
use crate::models::{PlaybackStats, PreferencesUpdate, WidgetPreferences};
use crate::presence::{PresenceEvent, Rect, Surface};

/// Connection and token diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub has_client_id: bool,
    pub has_token: bool,
    pub token_valid: bool,
    pub has_refresh_token: bool,
    pub token_expires_at: Option<i64>,
    pub polling: bool,
    pub backoff_level: u32,
    pub fullscreen_watch: bool,
    pub lyrics_visible: bool,
    pub lyrics_cached: usize,
    pub refresh: RefreshDiagnostics,
    pub preferences: WidgetPreferences,
}

/// Hands redirects to the engine without keeping it alive.
struct CallbackRelay(Weak<Engine>);

#[async_trait]
impl CallbackHandler for CallbackRelay {
    async fn complete_authorization(&self, code: &str, state: &str) -> Result<(), CallbackError> {
        match self.0.upgrade() {
            Some(engine) => engine.complete_authorization(code, state).await,
            None => Err(CallbackError::NoPendingTransaction),
        }
    }
}

impl Engine {
    fn client_id(&self) -> Option<String> {
        self.store.get(keys::CLIENT_ID).filter(|id| !id.is_empty())
    }

    pub fn set_client_id(&self, client_id: &str) -> Result<(), EngineError> {
        self.store.set(keys::CLIENT_ID, client_id.trim())?;
        Ok(())
    }

    /// Begin a connect attempt and return the consent URL to open.
    pub async fn connect(&self) -> Result<Url, EngineError> {
        let client_id = self.client_id().ok_or(EngineError::MissingClientId)?;

        let requested = stored_redirect_port(self.store.as_ref()).unwrap_or(self.settings.redirect_port);
        let port = self.ensure_callback_server(requested).await?;
        self.store.set(keys::REDIRECT_PORT, &port.to_string())?;

        let transaction = OAuthTransaction::generate(port)?;
        transaction.save(self.store.as_ref())?;

        let url = oauth::authorize_url(
            &self.auth,
            &client_id,
            &AuthConfig::redirect_uri(port),
            &transaction.state,
            &transaction.code_challenge(),
        )?;
        tracing::info!("Authorization started, waiting for redirect on port {}", port);
        Ok(url)
    }

    /// Start the loopback receiver once. Returns the bound port.
    async fn ensure_callback_server(&self, port: u16) -> Result<u16, EngineError> {
        let mut server = self.callback_server.lock().await;
        if let Some(running) = server.as_ref() {
            if port == 0 || running.port() == port {
                return Ok(running.port());
            }
        }

        let handler: Arc<dyn CallbackHandler> = Arc::new(CallbackRelay(self.this.clone()));
        let started = CallbackServer::start(port, handler)
            .map_err(|source| EngineError::CallbackServer { port, source })?;
        let bound = started.port();
        *server = Some(started);
        Ok(bound)
    }

    /// Validate a redirect against the pending transaction and store the tokens.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<(), CallbackError> {
        if code.is_empty() {
            return Err(CallbackError::MissingCode);
        }
        let transaction = OAuthTransaction::load(self.store.as_ref(), self.settings.redirect_port)
            .ok_or(CallbackError::NoPendingTransaction)?;
        if state.is_empty() || transaction.state != state {
            return Err(CallbackError::StateMismatch);
        }
        let client_id = self.client_id().ok_or(CallbackError::MissingClientId)?;

        let token_set = self
            .api
            .exchange_code(
                &client_id,
                code,
                &AuthConfig::redirect_uri(transaction.redirect_port),
                &transaction.code_verifier,
            )
            .await
            .map_err(|e| CallbackError::Exchange(e.to_string()))?;

        save_token_set(self.store.as_ref(), &token_set)
            .map_err(|e| CallbackError::Exchange(format!("{:#}", e)))?;
        if let Err(e) = OAuthTransaction::clear(self.store.as_ref()) {
            tracing::warn!("Failed to clear OAuth transaction: {:#}", e);
        }

        tracing::info!("Connected");
        self.sink.emit(PresenceEvent::Connected);
        self.start_polling();
        Ok(())
    }

    /// Forget the tokens, stop polling and hide every surface.
    pub fn disconnect(&self) -> Result<(), EngineError> {
        self.stop_polling();
        self.fullscreen.stop();
        self.coordinator.hide_all();
        self.sink.emit(PresenceEvent::NowPlaying(None));
        clear_token_set(self.store.as_ref())?;
        tracing::info!("Disconnected");
        Ok(())
    }

    /// Start polling if a token set is stored.
    pub fn resume(&self) {
        if load_token_set(self.store.as_ref()).is_some() {
            self.start_polling();
        } else {
            tracing::info!("No stored tokens, waiting for login");
        }
    }

    pub async fn player_action(&self, action: PlayerAction) -> Result<(), EngineError> {
        let access_token = self
            .tokens
            .valid_access_token()
            .await
            .ok_or(EngineError::NotConnected)?;
        let is_playing = self.last_snapshot().is_some_and(|s| s.is_playing);
        self.api
            .player_action(&access_token, action, is_playing)
            .await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<PlaybackStats, EngineError> {
        let access_token = self
            .tokens
            .valid_access_token()
            .await
            .ok_or(EngineError::NotConnected)?;
        self.api.stats(&access_token).await.map_err(|e| {
            if e.is_permission_denied() {
                EngineError::StatsPermissionDenied
            } else {
                EngineError::StatsUnavailable(e)
            }
        })
    }

    pub fn preferences(&self) -> WidgetPreferences {
        self.coordinator.preferences()
    }

    /// Merge `update` over the current preferences and push the result.
    pub fn set_preferences(&self, update: &PreferencesUpdate) -> Result<WidgetPreferences, EngineError> {
        let current = self.coordinator.preferences();
        let merged = current.merged(update);
        self.coordinator.save_preferences(&merged)?;

        if merged.size_preset != current.size_preset {
            self.coordinator.apply_widget_size()?;
        }
        self.sink.emit(PresenceEvent::Preferences(merged.clone()));
        Ok(merged)
    }

    /// Flip (or force) the lyrics surface. Returns the new state.
    pub async fn toggle_lyrics(&self, force: Option<bool>) -> Result<bool, EngineError> {
        let visible = force.unwrap_or(!self.coordinator.lyrics_enabled());
        self.coordinator.set_lyrics_enabled(visible)?;

        if !visible {
            self.coordinator.hide_lyrics();
            return Ok(false);
        }

        self.coordinator.show_lyrics_if_enabled();
        self.lyrics.publish();
        self.lyrics.update_for(self.last_snapshot().as_ref()).await;
        Ok(true)
    }

    /// Persist a user move of `surface`.
    pub fn surface_moved(&self, surface: Surface, bounds: Rect) -> Result<(), EngineError> {
        self.coordinator.persist_position(surface, bounds)?;
        Ok(())
    }

    pub fn display_metrics_changed(&self) {
        self.coordinator.reapply_widget_bounds();
    }

    /// One-off lookup outside the poll loop.
    pub async fn lookup_lyrics(&self, track: &str, artist: &str, duration_ms: u64) -> Option<String> {
        match self.lyrics.resolve(track, artist, duration_ms).await {
            Resolution::Unchanged(lyrics) | Resolution::Cached(lyrics) | Resolution::Fetched(lyrics) => {
                lyrics
            }
            Resolution::Cleared | Resolution::Stale => None,
        }
    }

    pub fn status(&self) -> EngineStatus {
        let token_set = load_token_set(self.store.as_ref());
        EngineStatus {
            has_client_id: self.client_id().is_some(),
            has_token: token_set.is_some(),
            token_valid: token_set.as_ref().is_some_and(|t| t.is_usable_at(now_ms())),
            has_refresh_token: token_set.as_ref().is_some_and(|t| !t.refresh_token.is_empty()),
            token_expires_at: token_set.as_ref().map(|t| t.expires_at),
            polling: self.is_polling(),
            backoff_level: self.backoff_level(),
            fullscreen_watch: self.fullscreen.is_running(),
            lyrics_visible: self.coordinator.lyrics_enabled(),
            lyrics_cached: self.lyrics.cached_entries(),
            refresh: self.tokens.diagnostics(),
            preferences: self.coordinator.preferences(),
        }
    }
}
