use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::common::errors::ResolveError;
use crate::common::types::SharedRw;

/// Anonymous token bootstrap endpoint; bypasses normal auth for read-only
/// lookups.
const TOKEN_URL: &str =
    "https://open.spotify.com/get_access_token?reason=transport&productType=embed";

/// Refresh this long before the advertised expiry to cover request time.
const EXPIRY_MARGIN_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousToken {
    pub access_token: String,
    pub access_token_expiration_timestamp_ms: u64,
}

pub struct SpotifyTokenTracker {
    client: reqwest::Client,
    token: SharedRw<Option<AnonymousToken>>,
}

impl SpotifyTokenTracker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_token(&self) -> Result<String, ResolveError> {
        {
            let token = self.token.read().await;
            if let Some(token) = &*token {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                if token.access_token_expiration_timestamp_ms > now + EXPIRY_MARGIN_MS {
                    return Ok(token.access_token.clone());
                }
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String, ResolveError> {
        debug!("fetching anonymous spotify token");
        let token: AnonymousToken = self
            .client
            .get(TOKEN_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let access_token = token.access_token.clone();
        *self.token.write().await = Some(token);
        Ok(access_token)
    }
}
