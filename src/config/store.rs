//! Credential store adapters
//!
//! The engine persists everything (client id, token set, OAuth transaction,
//! widget preferences and positions) through a flat string key/value store.
//! Last write wins; there are no transactions.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Well-known store keys.
pub mod keys {
    pub const CLIENT_ID: &str = "client_id";
    pub const TOKEN_SET: &str = "token_set";
    pub const OAUTH_STATE: &str = "oauth_state";
    pub const CODE_VERIFIER: &str = "code_verifier";
    pub const REDIRECT_PORT: &str = "redirect_port";
    pub const WIDGET_PREFERENCES: &str = "widget_preferences";
    pub const LYRICS_VISIBLE: &str = "lyrics_visible";
    /// Global fallback position shared by both surfaces.
    pub const WIDGET_POSITION: &str = "widget_position";
    pub const WIDGET_POSITION_PREFIX: &str = "widget_position.";
    pub const LYRICS_POSITION_PREFIX: &str = "lyrics_position.";
}

/// Key/value persistence used by the engine.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// TOML-file backed store. Every write rewrites the file.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read store file")?;
            toml::from_str(&content).context("Failed to parse store file")?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the store in the platform config directory.
    pub fn open_default() -> Result<Self> {
        Self::open(super::config_dir()?.join("store.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create store directory")?;
        }

        let content = toml::to_string_pretty(values).context("Failed to serialize store")?;
        fs::write(&self.path, content).context("Failed to write store file")?;

        // Store holds tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms).context("Failed to set store permissions")?;
        }

        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// Volatile store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// Read a JSON value stored under `key`. Unparseable values read as absent.
pub fn get_json<T: serde::de::DeserializeOwned>(store: &dyn CredentialStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring malformed store value for {}: {}", key, e);
            None
        }
    }
}

/// Store `value` as JSON under `key`.
pub fn set_json<T: serde::Serialize>(store: &dyn CredentialStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).context("Failed to serialize store value")?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("playback-presence-{}-{}", name, std::process::id()))
            .join("store.toml")
    }

    #[test]
    fn test_memory_store_last_write_wins() {
        let store = MemoryStore::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("two"));

        store.delete("k").unwrap();
        assert!(store.get("k").is_none());
        // Deleting a missing key is not an error.
        store.delete("k").unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_store_path("reopen");
        let _ = fs::remove_file(&path);

        {
            let store = FileStore::open(&path).unwrap();
            store.set(keys::CLIENT_ID, "abc123").unwrap();
            store.set(keys::LYRICS_VISIBLE, "true").unwrap();
            store.delete(keys::LYRICS_VISIBLE).unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::CLIENT_ID).as_deref(), Some("abc123"));
        assert!(reopened.get(keys::LYRICS_VISIBLE).is_none());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_json_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("prefs", "{not json").unwrap();
        let parsed: Option<serde_json::Value> = get_json(&store, "prefs");
        assert!(parsed.is_none());

        set_json(&store, "prefs", &serde_json::json!({"a": 1})).unwrap();
        let parsed: Option<serde_json::Value> = get_json(&store, "prefs");
        assert_eq!(parsed.unwrap()["a"], 1);
    }
}
