//! Aggregate listening stats

use serde::{Deserialize, Serialize};

use super::{Artist, Image};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsAlbum {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub album: Option<StatsAlbum>,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentlyPlayed {
    pub played_at: String,
    pub track: StatsTrack,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStats {
    pub recently_played: Vec<RecentlyPlayed>,
    pub top_tracks_short: Vec<StatsTrack>,
    pub top_tracks_medium: Vec<StatsTrack>,
    pub top_artists_short: Vec<StatsArtist>,
    pub top_artists_medium: Vec<StatsArtist>,
}
