//! Token storage and management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{get_json, keys, set_json, CredentialStore};

/// Seconds shaved off the provider's stated lifetime.
pub const EXPIRY_MARGIN_SECS: u64 = 30;

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry for a grant issued at `now_ms` with lifetime `expires_in`,
/// minus the safety margin.
pub fn expires_at_from(now_ms: i64, expires_in: Option<Duration>) -> i64 {
    let lifetime = expires_in
        .map(|d| d.as_secs())
        .unwrap_or(DEFAULT_LIFETIME_SECS)
        .saturating_sub(EXPIRY_MARGIN_SECS);
    now_ms.saturating_add((lifetime as i64).saturating_mul(1000))
}

/// Persisted credential set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds, margin already applied
    pub expires_at: i64,
}

impl TokenSet {
    /// A stored access token is reusable without a network call.
    pub fn is_usable_at(&self, now_ms: i64) -> bool {
        !self.access_token.is_empty() && now_ms < self.expires_at
    }

    /// Merge a refresh result. The refresh token is kept unless a new one was issued.
    pub fn merge(&self, refreshed: RefreshedToken) -> Self {
        Self {
            access_token: refreshed.access_token,
            refresh_token: refreshed
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
            expires_at: refreshed.expires_at,
        }
    }
}

/// Result of a refresh-token grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

pub fn load_token_set(store: &dyn CredentialStore) -> Option<TokenSet> {
    get_json(store, keys::TOKEN_SET)
}

pub fn save_token_set(store: &dyn CredentialStore, token_set: &TokenSet) -> Result<()> {
    set_json(store, keys::TOKEN_SET, token_set)
}

pub fn clear_token_set(store: &dyn CredentialStore) -> Result<()> {
    store.delete(keys::TOKEN_SET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;

    #[test]
    fn test_expiry_applies_margin() {
        let at = expires_at_from(1_000_000, Some(Duration::from_secs(3600)));
        assert_eq!(at, 1_000_000 + 3570 * 1000);

        let default = expires_at_from(0, None);
        assert_eq!(default, 3570 * 1000);

        // A lifetime shorter than the margin expires immediately.
        assert_eq!(expires_at_from(5_000, Some(Duration::from_secs(10))), 5_000);
    }

    #[test]
    fn test_usable_requires_future_expiry_and_token() {
        let set = TokenSet {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: 10_000,
        };
        assert!(set.is_usable_at(9_999));
        assert!(!set.is_usable_at(10_000));

        let empty = TokenSet {
            access_token: String::new(),
            ..set
        };
        assert!(!empty.is_usable_at(0));
    }

    #[test]
    fn test_merge_preserves_refresh_token() {
        let set = TokenSet {
            access_token: "old".into(),
            refresh_token: "rt-1".into(),
            expires_at: 1,
        };
        let merged = set.merge(RefreshedToken {
            access_token: "new".into(),
            refresh_token: None,
            expires_at: 2,
        });
        assert_eq!(merged.refresh_token, "rt-1");
        assert_eq!(merged.access_token, "new");

        let rotated = set.merge(RefreshedToken {
            access_token: "new".into(),
            refresh_token: Some("rt-2".into()),
            expires_at: 2,
        });
        assert_eq!(rotated.refresh_token, "rt-2");
    }

    #[test]
    fn test_token_set_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(load_token_set(&store).is_none());

        let set = TokenSet {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: 42,
        };
        save_token_set(&store, &set).unwrap();
        assert_eq!(load_token_set(&store), Some(set));

        clear_token_set(&store).unwrap();
        assert!(load_token_set(&store).is_none());
    }
}
