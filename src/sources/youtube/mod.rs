//! Video links carry no fingerprint, so resolution is search-based: the
//! video title is looked up on the catalog and the first hit wins.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::api::CatalogApi;
use crate::catalog::fingerprint::FingerprintResolver;
use crate::catalog::types::Track;
use crate::common::errors::ResolveError;

const OEMBED_URL: &str = "https://www.youtube.com/oembed";

#[derive(Debug, Deserialize)]
struct OembedBody {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<SearchHit>,
}

/// Misses come back as an empty data array with HTTP 200, so a non-quota
/// error envelope here is a real API failure, not "no match".
fn parse_search(body: Value) -> Result<SearchPage, ResolveError> {
    if let Some(error) = body.get("error") {
        return Err(ResolveError::Gateway(error.to_string()));
    }
    serde_json::from_value(body).map_err(|e| ResolveError::Schema("search", e.to_string()))
}

pub struct YoutubeSource {
    client: reqwest::Client,
    lookups: Arc<FingerprintResolver>,
    api: Arc<CatalogApi>,
}

impl YoutubeSource {
    pub fn new(
        client: reqwest::Client,
        lookups: Arc<FingerprintResolver>,
        api: Arc<CatalogApi>,
    ) -> Self {
        Self {
            client,
            lookups,
            api,
        }
    }

    pub async fn track_to_deezer(&self, video_id: &str) -> Result<Track, ResolveError> {
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let video: OembedBody = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", video_url.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Same quota-aware path as the fingerprint lookups; quota errors
        // are retried there and surface as rate-limit, not as a miss.
        let body = self
            .lookups
            .lookup("search", &[("q", video.title.as_str()), ("limit", "1")])
            .await?;
        let page = parse_search(body)?;

        let hit = page
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound(video.title.clone()))?;
        self.api.get_track(&hit.id.to_string()).await
    }
}
