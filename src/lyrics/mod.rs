//! Lyrics resolution
//!
//! Two ordered remote sources behind a common trait, a bounded cache keyed
//! by track and artist, and a resolver that discards completions for a
//! track the user has already skipped.

mod cache;
pub mod lrclib;
pub mod ovh;
mod resolver;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use cache::LyricsCache;
pub use lrclib::LrclibSource;
pub use ovh::LyricsOvhSource;
pub use resolver::{LyricsResolver, Resolution};

/// Lookup parameters, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    pub track: String,
    pub artist: String,
    /// Track length hint, 0 if unknown
    pub duration_ms: u64,
}

impl LyricsQuery {
    /// `None` if track or artist is blank.
    pub fn new(track: &str, artist: &str, duration_ms: u64) -> Option<Self> {
        let track = track.trim();
        let artist = artist.trim();
        if track.is_empty() || artist.is_empty() {
            return None;
        }
        Some(Self {
            track: track.to_string(),
            artist: artist.to_string(),
            duration_ms,
        })
    }

    /// Cache key, `"<track>__<artist>"` (case-sensitive).
    pub fn key(&self) -> String {
        format!("{}__{}", self.track, self.artist)
    }

    /// Duration hint in whole seconds, if known.
    pub fn duration_secs(&self) -> Option<u64> {
        if self.duration_ms == 0 {
            return None;
        }
        Some((self.duration_ms + 500) / 1000)
    }
}

/// A remote lyrics catalogue.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the source has no lyrics for the query.
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>>;
}

/// Query sources in order; the first hit wins. Never fails.
pub async fn fetch_from_sources(
    sources: &[Arc<dyn LyricsSource>],
    query: &LyricsQuery,
) -> Option<String> {
    for source in sources {
        tracing::debug!("Trying {} for {}", source.name(), query.key());
        match source.fetch(query).await {
            Ok(Some(text)) => return Some(text),
            Ok(None) => {
                tracing::debug!("{} has no lyrics, trying next source", source.name());
            }
            Err(e) => {
                tracing::warn!("{} lyrics lookup failed: {:#}", source.name(), e);
            }
        }
    }

    tracing::debug!("No lyrics found for {}", query.key());
    None
}

/// The default source chain.
pub fn default_sources(http: reqwest::Client) -> Vec<Arc<dyn LyricsSource>> {
    vec![
        Arc::new(LrclibSource::new(http.clone())) as Arc<dyn LyricsSource>,
        Arc::new(LyricsOvhSource::new(http)) as Arc<dyn LyricsSource>,
    ]
}
