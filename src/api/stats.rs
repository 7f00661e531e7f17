//! Listening stats: five queries fetched concurrently, failing as a unit

use serde::de::DeserializeOwned;

use super::client::SpotifyClient;
use super::ApiError;
use crate::models::{PlaybackStats, RecentlyPlayed, StatsArtist, StatsTrack};

const RECENTLY_PLAYED: &str = "/me/player/recently-played?limit=50";
const TOP_TRACKS_SHORT: &str = "/me/top/tracks?limit=20&time_range=short_term";
const TOP_TRACKS_MEDIUM: &str = "/me/top/tracks?limit=20&time_range=medium_term";
const TOP_ARTISTS_SHORT: &str = "/me/top/artists?limit=20&time_range=short_term";
const TOP_ARTISTS_MEDIUM: &str = "/me/top/artists?limit=20&time_range=medium_term";

/// `items` of a paging object; anything but an array reads as empty.
pub(super) fn items_or_empty<T: DeserializeOwned>(page: serde_json::Value) -> Vec<T> {
    match page.get("items") {
        Some(items @ serde_json::Value::Array(_)) => {
            serde_json::from_value(items.clone()).unwrap_or_else(|e| {
                tracing::warn!("Skipping malformed stats page: {}", e);
                Vec::new()
            })
        }
        _ => Vec::new(),
    }
}

async fn fetch_items<T: DeserializeOwned>(
    client: &SpotifyClient,
    access_token: &str,
    path: &str,
) -> Result<Vec<T>, ApiError> {
    let resp = client.get(access_token, path).await?;
    let page: serde_json::Value = resp.json().await.map_err(|source| ApiError::Decode {
        url: client.url(path),
        source,
    })?;
    Ok(items_or_empty(page))
}

pub(super) async fn fetch_stats(
    client: &SpotifyClient,
    access_token: &str,
) -> Result<PlaybackStats, ApiError> {
    let (recently_played, top_tracks_short, top_tracks_medium, top_artists_short, top_artists_medium) =
        futures::try_join!(
            fetch_items::<RecentlyPlayed>(client, access_token, RECENTLY_PLAYED),
            fetch_items::<StatsTrack>(client, access_token, TOP_TRACKS_SHORT),
            fetch_items::<StatsTrack>(client, access_token, TOP_TRACKS_MEDIUM),
            fetch_items::<StatsArtist>(client, access_token, TOP_ARTISTS_SHORT),
            fetch_items::<StatsArtist>(client, access_token, TOP_ARTISTS_MEDIUM),
        )?;

    Ok(PlaybackStats {
        recently_played,
        top_tracks_short,
        top_tracks_medium,
        top_artists_short,
        top_artists_medium,
    })
}
