//! lyrics.ovh: plain-text fallback, path-based lookup

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{LyricsQuery, LyricsSource};

const BASE_URL: &str = "https://api.lyrics.ovh";

#[derive(Debug, Deserialize)]
struct OvhResponse {
    lyrics: Option<String>,
}

pub struct LyricsOvhSource {
    http: reqwest::Client,
    base_url: String,
}

impl LyricsOvhSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    /// `<base>/v1/<artist>/<track>`, each segment percent-encoded.
    fn lookup_url(&self, query: &LyricsQuery) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("Invalid lyrics.ovh url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("lyrics.ovh url cannot have a path"))?
            .push("v1")
            .push(&query.artist)
            .push(&query.track);
        Ok(url)
    }
}

#[async_trait]
impl LyricsSource for LyricsOvhSource {
    fn name(&self) -> &str {
        "lyrics.ovh"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let url = self.lookup_url(query)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("lyrics.ovh request failed")?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let body: OvhResponse = resp.json().await.context("Failed to parse lyrics.ovh response")?;
        Ok(body.lyrics.filter(|text| !text.is_empty()))
    }
}
