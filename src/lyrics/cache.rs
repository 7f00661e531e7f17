//! Bounded lyrics cache with oldest-inserted eviction

use std::num::NonZeroUsize;

use lru::LruCache;

/// Maps `"<track>__<artist>"` to lyric text, or `None` for "not found".
///
/// Reads go through `peek` and overwrites through `peek_mut`, so only
/// inserting a new key moves an entry in the LRU order.
#[derive(Debug)]
pub struct LyricsCache {
    entries: LruCache<String, Option<String>>,
}

impl LyricsCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Outer `None` is a miss; `Some(None)` is a cached "not found".
    pub fn get(&self, key: &str) -> Option<Option<String>> {
        self.entries.peek(key).cloned()
    }

    /// Overwriting an existing key keeps its original insertion slot.
    pub fn insert(&mut self, key: String, lyrics: Option<String>) {
        if let Some(slot) = self.entries.peek_mut(&key) {
            *slot = lyrics;
            return;
        }
        if let Some((evicted, _)) = self.entries.push(key, lyrics) {
            tracing::debug!("Evicted cached lyrics for {}", evicted);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
