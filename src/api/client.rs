//! Authenticated HTTP client for the playback API
//!
//! Wraps reqwest::Client with bearer auth, a request timeout and uniform
//! status checking.

use std::time::Duration;

use async_trait::async_trait;

use super::{player, stats, ApiError, PlaybackApi, PlayerAction};
use crate::auth::{oauth, AuthConfig, RefreshedToken, TokenSet};
use crate::models::{PlaybackSnapshot, PlaybackStats};

const API_BASE: &str = "https://api.spotify.com/v1";

/// Stateless client: the access token is passed per call.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    auth: AuthConfig,
    api_base: String,
    timeout: Duration,
}

impl SpotifyClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: API_BASE.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            auth: AuthConfig::default(),
            api_base: API_BASE.to_string(),
            timeout,
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// GET with bearer auth; status already checked.
    pub(super) async fn get(&self, access_token: &str, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        check_response(resp, &url).await
    }

    /// Bodyless POST/PUT used by the player controls.
    pub(super) async fn send_empty(
        &self,
        method: reqwest::Method,
        access_token: &str,
        path: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let resp = self
            .http
            .request(method, &url)
            .bearer_auth(access_token)
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a classified error on failure.
pub(super) async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            url: url.to_string(),
        });
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Forbidden {
            url: url.to_string(),
            body,
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    async fn exchange_code(
        &self,
        client_id: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, ApiError> {
        oauth::exchange_code(
            &self.auth,
            client_id,
            code,
            redirect_uri,
            code_verifier,
            self.timeout,
        )
        .await
    }

    async fn refresh_access_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, ApiError> {
        oauth::refresh_access_token(&self.auth, client_id, refresh_token, self.timeout).await
    }

    async fn now_playing(&self, access_token: &str) -> Result<Option<PlaybackSnapshot>, ApiError> {
        player::now_playing(self, access_token).await
    }

    async fn player_action(
        &self,
        access_token: &str,
        action: PlayerAction,
        is_playing: bool,
    ) -> Result<(), ApiError> {
        player::player_action(self, access_token, action, is_playing).await
    }

    async fn stats(&self, access_token: &str) -> Result<PlaybackStats, ApiError> {
        stats::fetch_stats(self, access_token).await
    }
}
