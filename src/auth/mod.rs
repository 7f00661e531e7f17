//! Authentication module
//!
//! Implements the OAuth2 authorization-code flow with PKCE against the
//! streaming provider, a loopback receiver for the redirect, and the
//! token lifecycle (reuse, refresh, or report "not connected").

pub mod callback;
pub mod lifecycle;
pub mod oauth;
pub mod pkce;
pub mod tokens;

pub use callback::{CallbackError, CallbackHandler, CallbackServer};
pub use lifecycle::{RefreshDiagnostics, TokenManager};
pub use pkce::OAuthTransaction;
pub use tokens::{RefreshedToken, TokenSet};

/// Default loopback port for the OAuth redirect.
pub const DEFAULT_REDIRECT_PORT: u16 = 43821;

/// Scopes requested at authorization time.
pub const SCOPES: &[&str] = &[
    "user-read-currently-playing",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-recently-played",
    "user-top-read",
];

/// Provider endpoint configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth2 authorize endpoint (browser consent page)
    pub authorize_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
}

impl AuthConfig {
    pub fn spotify() -> Self {
        Self {
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
        }
    }

    /// Redirect URI registered for the loopback receiver on `port`.
    pub fn redirect_uri(port: u16) -> String {
        format!("http://127.0.0.1:{}/callback", port)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::spotify()
    }
}
