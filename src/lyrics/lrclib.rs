//! LRCLIB: synced or plain lyrics, disambiguated by duration

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{LyricsQuery, LyricsSource};

const BASE_URL: &str = "https://lrclib.net/api";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibResponse {
    synced_lyrics: Option<String>,
    plain_lyrics: Option<String>,
}

impl LrclibResponse {
    /// Synced text preferred; blank values count as missing.
    fn into_text(self) -> Option<String> {
        [self.synced_lyrics, self.plain_lyrics]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
    }
}

pub struct LrclibSource {
    http: reqwest::Client,
    base_url: String,
}

impl LrclibSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    fn lookup_url(&self, query: &LyricsQuery) -> Result<Url> {
        let mut params = vec![
            ("track_name", query.track.clone()),
            ("artist_name", query.artist.clone()),
        ];
        if let Some(secs) = query.duration_secs() {
            params.push(("duration", secs.to_string()));
        }
        Url::parse_with_params(&format!("{}/get", self.base_url), &params)
            .context("Invalid LRCLIB url")
    }
}

#[async_trait]
impl LyricsSource for LrclibSource {
    fn name(&self) -> &str {
        "lrclib"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let url = self.lookup_url(query)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("LRCLIB request failed")?;

        if !resp.status().is_success() {
            tracing::debug!("LRCLIB returned HTTP {}", resp.status().as_u16());
            return Ok(None);
        }

        let body: LrclibResponse = resp.json().await.context("Failed to parse LRCLIB response")?;
        Ok(body.into_text())
    }
}
