//! Currently-playing and transport controls

use reqwest::{Method, StatusCode};

use super::client::SpotifyClient;
use super::{ApiError, PlayerAction};
use crate::models::PlaybackSnapshot;

/// Endpoint and method for a transport action.
pub(super) fn action_route(action: PlayerAction, is_playing: bool) -> (Method, &'static str) {
    match action {
        PlayerAction::Previous => (Method::POST, "/me/player/previous"),
        PlayerAction::Next => (Method::POST, "/me/player/next"),
        PlayerAction::Toggle if is_playing => (Method::PUT, "/me/player/pause"),
        PlayerAction::Toggle => (Method::PUT, "/me/player/play"),
    }
}

/// Fetch the current playback; 204 means nothing is playing.
pub(super) async fn now_playing(
    client: &SpotifyClient,
    access_token: &str,
) -> Result<Option<PlaybackSnapshot>, ApiError> {
    let resp = client
        .get(access_token, "/me/player/currently-playing")
        .await?;

    if resp.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let url = client.url("/me/player/currently-playing");
    let snapshot = resp
        .json::<PlaybackSnapshot>()
        .await
        .map_err(|source| ApiError::Decode { url, source })?;
    Ok(Some(snapshot))
}

pub(super) async fn player_action(
    client: &SpotifyClient,
    access_token: &str,
    action: PlayerAction,
    is_playing: bool,
) -> Result<(), ApiError> {
    let (method, path) = action_route(action, is_playing);
    tracing::info!("Player action: {}", action);
    client.send_empty(method, access_token, path).await?;
    Ok(())
}
