//! "Now playing" models

use serde::{Deserialize, Serialize};

/// Album artwork
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

/// Currently playing work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl TrackInfo {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    /// "Artist, Artist - Title"
    pub fn display_line(&self) -> String {
        let artists = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", artists, self.name)
        }
    }
}

/// One poll result. Immutable; superseded by the next poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<TrackInfo>,
}

impl PlaybackSnapshot {
    /// Something is audibly playing.
    pub fn is_active(&self) -> bool {
        self.is_playing && self.item.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currently_playing() {
        let json = r#"{
            "timestamp": 1700000000000,
            "progress_ms": 42000,
            "is_playing": true,
            "currently_playing_type": "track",
            "item": {
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "name": "Song",
                "duration_ms": 200000,
                "album": {
                    "name": "Album",
                    "images": [{"url": "https://i.scdn.co/image/a", "height": 640, "width": 640}]
                },
                "artists": [{"name": "Artist", "id": "x"}, {"name": "Guest"}],
                "external_urls": {"spotify": "https://open.spotify.com/track/x"}
            }
        }"#;

        let snapshot: PlaybackSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.is_active());
        assert_eq!(snapshot.progress_ms, Some(42000));
        let item = snapshot.item.unwrap();
        assert_eq!(item.primary_artist(), Some("Artist"));
        assert_eq!(item.album.images.len(), 1);
        assert_eq!(item.display_line(), "Artist, Guest - Song");
    }

    #[test]
    fn test_parse_without_item_or_album() {
        let snapshot: PlaybackSnapshot =
            serde_json::from_str(r#"{"is_playing": true, "item": null}"#).unwrap();
        assert!(!snapshot.is_active());

        // Episodes carry no album or artists
        let snapshot: PlaybackSnapshot =
            serde_json::from_str(r#"{"is_playing": false, "item": {"name": "Episode 12"}}"#)
                .unwrap();
        assert!(!snapshot.is_active());
        let item = snapshot.item.unwrap();
        assert_eq!(item.primary_artist(), None);
        assert_eq!(item.display_line(), "Episode 12");
    }
}
