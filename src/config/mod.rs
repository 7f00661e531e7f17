//! Configuration and credential storage

mod store;

pub use store::{get_json, keys, set_json, CredentialStore, FileStore};
#[cfg(test)]
pub use store::MemoryStore;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::DEFAULT_REDIRECT_PORT;

/// Get config directory path
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "playback-presence", "playback-presence")
        .context("Could not determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// User-editable settings (`config.toml`). Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Loopback port for the OAuth redirect
    pub redirect_port: u16,
    /// Timeout applied to every remote HTTP call
    pub http_timeout_secs: u64,
    /// Maximum number of cached lyric lookups
    pub lyrics_cache_capacity: usize,
    /// Poll cadence
    pub polling: PollingSettings,
    /// Foreground-window probing
    pub fullscreen: FullscreenSettings,
    /// Diagnostics log file (appended, never rotated)
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub playing_ms: u64,
    pub idle_ms: u64,
    pub error_base_ms: u64,
    pub error_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FullscreenSettings {
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
    /// Foreground area / work area ratio above which a window counts as fullscreen
    pub ratio: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redirect_port: DEFAULT_REDIRECT_PORT,
            http_timeout_secs: 10,
            lyrics_cache_capacity: 200,
            polling: PollingSettings::default(),
            fullscreen: FullscreenSettings::default(),
            log_file: None,
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            playing_ms: 3_500,
            idle_ms: 12_000,
            error_base_ms: 6_000,
            error_max_ms: 60_000,
        }
    }
}

impl Default for FullscreenSettings {
    fn default() -> Self {
        Self {
            probe_interval_ms: 3_000,
            probe_timeout_ms: 1_200,
            ratio: 0.92,
        }
    }
}

impl Settings {
    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load settings from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from `path`, or defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
