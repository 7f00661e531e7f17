//! Lyrics resolution for the currently playing track
//!
//! Each lookup captures a generation number before awaiting the sources and
//! compares it afterwards. A lookup overtaken by a newer one still fills the
//! cache but never publishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{fetch_from_sources, LyricsCache, LyricsQuery, LyricsSource};
use crate::models::PlaybackSnapshot;
use crate::presence::{EventSink, LyricsPayload, PresenceEvent};

/// How a resolve call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No track or artist; lyrics cleared
    Cleared,
    /// Same key as the previous call; nothing fetched
    Unchanged(Option<String>),
    Cached(Option<String>),
    Fetched(Option<String>),
    /// A newer lookup started while this one was fetching
    Stale,
}

struct ResolverState {
    last_key: Option<String>,
    current: Option<String>,
    loading: bool,
    now_playing: Option<PlaybackSnapshot>,
    cache: LyricsCache,
}

pub struct LyricsResolver {
    sources: Vec<Arc<dyn LyricsSource>>,
    sink: Arc<dyn EventSink>,
    state: Mutex<ResolverState>,
    generation: AtomicU64,
}

impl LyricsResolver {
    pub fn new(
        sources: Vec<Arc<dyn LyricsSource>>,
        sink: Arc<dyn EventSink>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            sources,
            sink,
            state: Mutex::new(ResolverState {
                last_key: None,
                current: None,
                loading: false,
                now_playing: None,
                cache: LyricsCache::new(cache_capacity),
            }),
            generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn payload(&self) -> LyricsPayload {
        let state = self.lock();
        LyricsPayload {
            lyrics: state.current.clone(),
            loading: state.loading,
            now_playing: state.now_playing.clone(),
        }
    }

    pub fn publish(&self) {
        self.sink.emit(PresenceEvent::Lyrics(self.payload()));
    }

    /// Snapshot sent along with every payload.
    pub fn set_now_playing(&self, snapshot: Option<PlaybackSnapshot>) {
        self.lock().now_playing = snapshot;
    }

    pub fn cached_entries(&self) -> usize {
        self.lock().cache.len()
    }

    /// Resolve lyrics for whatever `snapshot` is playing.
    pub async fn update_for(&self, snapshot: Option<&PlaybackSnapshot>) -> Resolution {
        let item = snapshot.and_then(|s| s.item.as_ref());
        let track = item.map(|i| i.name.as_str()).unwrap_or_default();
        let artist = item.and_then(|i| i.primary_artist()).unwrap_or_default();
        let duration_ms = item.map(|i| i.duration_ms).unwrap_or_default();
        self.resolve(track, artist, duration_ms).await
    }

    pub async fn resolve(&self, track: &str, artist: &str, duration_ms: u64) -> Resolution {
        let Some(query) = LyricsQuery::new(track, artist, duration_ms) else {
            self.clear();
            return Resolution::Cleared;
        };
        let key = query.key();

        let generation = {
            let mut state = self.lock();
            if state.last_key.as_deref() == Some(key.as_str()) {
                return Resolution::Unchanged(state.current.clone());
            }
            state.last_key = Some(key.clone());
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(hit) = state.cache.get(&key) {
                state.current = hit.clone();
                state.loading = false;
                drop(state);
                self.publish();
                return Resolution::Cached(hit);
            }

            state.current = None;
            state.loading = true;
            generation
        };
        self.publish();

        let lyrics = fetch_from_sources(&self.sources, &query).await;

        {
            let mut state = self.lock();
            state.cache.insert(key.clone(), lyrics.clone());
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("Dropping lyrics for {}, track changed", key);
                return Resolution::Stale;
            }
            state.current = lyrics.clone();
            state.loading = false;
        }
        self.publish();
        Resolution::Fetched(lyrics)
    }

    /// Forget the current track so it is looked up again when it returns.
    fn clear(&self) {
        {
            let mut state = self.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            state.last_key = None;
            state.current = None;
            state.loading = false;
        }
        self.publish();
    }
}
