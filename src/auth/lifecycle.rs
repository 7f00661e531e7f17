//! Token lifecycle: reuse, refresh, or report "not connected"

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::tokens::{load_token_set, now_ms, save_token_set};
use crate::api::PlaybackApi;
use crate::config::{keys, CredentialStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Idle,
    Ok,
    Error,
}

/// Outcome of the most recent refresh attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshDiagnostics {
    pub status: RefreshStatus,
    /// Epoch milliseconds of the last attempt (0 if none)
    pub at: i64,
    pub error: String,
}

impl Default for RefreshDiagnostics {
    fn default() -> Self {
        Self {
            status: RefreshStatus::Idle,
            at: 0,
            error: String::new(),
        }
    }
}

/// Sole owner of token validity decisions.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    api: Arc<dyn PlaybackApi>,
    diagnostics: Mutex<RefreshDiagnostics>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, api: Arc<dyn PlaybackApi>) -> Self {
        Self {
            store,
            api,
            diagnostics: Mutex::new(RefreshDiagnostics::default()),
        }
    }

    /// A usable access token, or `None` when not connected.
    ///
    /// Never fails: refresh errors are recorded in the diagnostics and read
    /// as "not connected".
    pub async fn valid_access_token(&self) -> Option<String> {
        let token_set = load_token_set(self.store.as_ref())?;
        let client_id = self.store.get(keys::CLIENT_ID)?;

        if token_set.is_usable_at(now_ms()) {
            return Some(token_set.access_token);
        }

        tracing::info!("Access token expired, refreshing");

        match self
            .api
            .refresh_access_token(&client_id, &token_set.refresh_token)
            .await
        {
            Ok(refreshed) => {
                let updated = token_set.merge(refreshed);
                if let Err(e) = save_token_set(self.store.as_ref(), &updated) {
                    tracing::warn!("Refreshed token could not be persisted: {:#}", e);
                }
                self.record(RefreshStatus::Ok, String::new());
                tracing::info!("Token refresh succeeded");
                Some(updated.access_token)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                self.record(RefreshStatus::Error, e.to_string());
                None
            }
        }
    }

    pub fn diagnostics(&self) -> RefreshDiagnostics {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, status: RefreshStatus, error: String) {
        let mut diagnostics = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        *diagnostics = RefreshDiagnostics {
            status,
            at: now_ms(),
            error,
        };
    }
}
