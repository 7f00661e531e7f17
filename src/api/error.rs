//! Classified remote failures

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("401 Unauthorized for {url}")]
    Unauthorized { url: String },

    #[error("403 Forbidden for {url}: {body}")]
    Forbidden { url: String, body: String },

    #[error("HTTP {status} for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OAuth token request failed: {0}")]
    OAuth(String),
}

impl ApiError {
    /// Missing or insufficient grant; reconnecting is the remedy.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }
}
