//! Remote playback client
//!
//! Request/response functions against the streaming provider. Every call
//! validates the HTTP status; "nothing playing" (204) is not an error.

pub mod client;
mod error;
mod player;
mod stats;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

pub use client::SpotifyClient;
pub use error::ApiError;

use crate::auth::{RefreshedToken, TokenSet};
use crate::models::{PlaybackSnapshot, PlaybackStats};

/// Transport control requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Previous,
    Next,
    /// Pause if playing, otherwise resume
    Toggle,
}

impl FromStr for PlayerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "previous" | "prev" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            "toggle" => Ok(Self::Toggle),
            other => Err(format!(
                "Unknown action: {}. Use: previous, next, toggle",
                other
            )),
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Previous => "previous",
            Self::Next => "next",
            Self::Toggle => "toggle",
        };
        f.write_str(name)
    }
}

/// Everything the engine needs from the provider.
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    /// Authorization-code grant with the PKCE verifier.
    async fn exchange_code(
        &self,
        client_id: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, ApiError>;

    /// Refresh-token grant.
    async fn refresh_access_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, ApiError>;

    /// `Ok(None)` when nothing is playing.
    async fn now_playing(&self, access_token: &str) -> Result<Option<PlaybackSnapshot>, ApiError>;

    /// `is_playing` decides whether `Toggle` pauses or resumes.
    async fn player_action(
        &self,
        access_token: &str,
        action: PlayerAction,
        is_playing: bool,
    ) -> Result<(), ApiError>;

    /// All five stats queries; fails as a unit.
    async fn stats(&self, access_token: &str) -> Result<PlaybackStats, ApiError>;
}
