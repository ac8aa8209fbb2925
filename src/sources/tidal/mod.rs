pub mod model;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;
use tracing::warn;

use crate::catalog::fingerprint::FingerprintResolver;
use crate::catalog::types::{Album, Playlist, Track};
use crate::common::errors::ResolveError;
use crate::common::types::Shared;
use crate::fanout::{ItemErrorHandler, run_all};
use model::*;

const API_BASE: &str = "https://api.tidal.com/v1";

/// Read-only web token used when no token is configured.
const DEFAULT_WEB_TOKEN: &str = "CzET4vdadNUFQ5JU";

const PAGE_LIMIT: u64 = 100;

/// The service's own ceiling for artist top-track listings.
const TOP_TRACKS_LIMIT: u64 = 10;

/// Converts Tidal entities into their Deezer counterparts by ISRC/UPC.
pub struct TidalSource {
    client: reqwest::Client,
    resolver: Arc<FingerprintResolver>,
    token: String,
    country_code: String,
    item_concurrency: usize,
}

impl TidalSource {
    pub fn new(
        client: reqwest::Client,
        resolver: Arc<FingerprintResolver>,
        token: Option<String>,
        country_code: String,
        item_concurrency: usize,
    ) -> Self {
        Self {
            client,
            resolver,
            token: token.unwrap_or_else(|| DEFAULT_WEB_TOKEN.to_string()),
            country_code,
            item_concurrency,
        }
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, ResolveError> {
        let response = self
            .client
            .get(format!("{}/{}", API_BASE, path))
            .query(&[
                ("token", self.token.as_str()),
                ("countryCode", self.country_code.as_str()),
            ])
            .query(extra)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn track_to_deezer(&self, id: &str) -> Result<Track, ResolveError> {
        let track: TidalTrack = self.api_get(&format!("tracks/{}", id), &[]).await?;
        self.resolver
            .by_isrc(&track.title, track.isrc.as_deref())
            .await
    }

    pub async fn album_to_deezer(&self, id: &str) -> Result<(Album, Vec<Track>), ResolveError> {
        let album: TidalAlbum = self.api_get(&format!("albums/{}", id), &[]).await?;
        self.resolver
            .by_upc(&album.title, album.upc.as_deref())
            .await
    }

    /// Sequential page drain of the playlist's items, then fan-out per
    /// item; position from the item's original index.
    pub async fn playlist_to_deezer(
        &self,
        id: &str,
        on_error: Option<ItemErrorHandler<'_>>,
    ) -> Result<(Playlist, Vec<Track>), ResolveError> {
        let playlist: TidalPlaylist = self.api_get(&format!("playlists/{}", id), &[]).await?;

        let mut items: Vec<TidalPlaylistItem> = Vec::new();
        let mut offset = 0u64;
        loop {
            let limit = PAGE_LIMIT.to_string();
            let offset_param = offset.to_string();
            let page: TidalPage<TidalPlaylistItem> = self
                .api_get(
                    &format!("playlists/{}/items", id),
                    &[("limit", limit.as_str()), ("offset", offset_param.as_str())],
                )
                .await?;

            let fetched = page.items.len() as u64;
            items.extend(page.items);
            offset += fetched;
            if fetched == 0 || offset >= page.total_number_of_items {
                break;
            }
        }

        let collected: Shared<Vec<Track>> = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let collected = collected.clone();
                let resolver = self.resolver.clone();
                async move {
                    let Some(entry) = item.item else {
                        return;
                    };
                    match resolver.by_isrc(&entry.title, entry.isrc.as_deref()).await {
                        Ok(mut track) => {
                            track.track_position = Some(index as u32 + 1);
                            collected.lock().await.push(track);
                        }
                        Err(err) => match on_error {
                            Some(handler) => handler(index, err),
                            None => warn!("skipping playlist item {}: {}", index, err),
                        },
                    }
                }
            })
            .collect();
        run_all(tasks, self.item_concurrency).await;

        let tracks = std::mem::take(&mut *collected.lock().await);
        let record = playlist_record(&playlist, utc_now_rfc3339());
        Ok((record, tracks))
    }

    /// Top tracks only, capped by the service; no pagination.
    pub async fn artist_to_deezer(
        &self,
        id: &str,
        on_error: Option<ItemErrorHandler<'_>>,
    ) -> Result<Vec<Track>, ResolveError> {
        let limit = TOP_TRACKS_LIMIT.to_string();
        let page: TidalPage<TidalTrack> = self
            .api_get(
                &format!("artists/{}/toptracks", id),
                &[("limit", limit.as_str())],
            )
            .await?;

        let collected: Shared<Vec<Track>> = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<_> = page
            .items
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let collected = collected.clone();
                let resolver = self.resolver.clone();
                async move {
                    match resolver.by_isrc(&entry.title, entry.isrc.as_deref()).await {
                        Ok(track) => collected.lock().await.push(track),
                        Err(err) => match on_error {
                            Some(handler) => handler(index, err),
                            None => warn!("skipping top track {}: {}", index, err),
                        },
                    }
                }
            })
            .collect();
        run_all(tasks, self.item_concurrency).await;

        Ok(std::mem::take(&mut *collected.lock().await))
    }
}

fn utc_now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn playlist_record(playlist: &TidalPlaylist, created: String) -> Playlist {
    let owner = playlist
        .creator
        .as_ref()
        .map(|c| c.id.to_string())
        .unwrap_or_default();
    Playlist {
        id: playlist.uuid.clone(),
        title: playlist.title.clone(),
        owner_name: owner.clone(),
        owner_id: owner,
        picture: String::new(),
        picture_type: "cover".to_string(),
        song_count: playlist.number_of_tracks,
        fan_count: 0,
        checksum: playlist.uuid.clone(),
        date_add: created.clone(),
        date_mod: created.clone(),
        date_create: created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_record_uses_uuid_and_creator() {
        let playlist = TidalPlaylist {
            uuid: "7ce7df52-6a9d-4c3e-99f7-9a72b0f0f0ab".to_string(),
            title: "Deep Focus".to_string(),
            number_of_tracks: 42,
            creator: Some(TidalCreator { id: 172361936 }),
        };

        let record = playlist_record(&playlist, "2024-06-01T00:00:00Z".to_string());
        assert_eq!(record.id, "7ce7df52-6a9d-4c3e-99f7-9a72b0f0f0ab");
        assert_eq!(record.owner_id, "172361936");
        assert_eq!(record.song_count, 42);
        assert_eq!(record.checksum, record.id);
    }

    #[test]
    fn test_page_deserializes_with_and_without_items() {
        let page: TidalPage<TidalTrack> =
            serde_json::from_str(r#"{"totalNumberOfItems": 0}"#).expect("empty page");
        assert!(page.items.is_empty());
        assert_eq!(page.total_number_of_items, 0);

        let page: TidalPage<TidalTrack> = serde_json::from_str(
            r#"{
                "items": [{"id": 77646170, "title": "Alive", "isrc": "NOG841735010"}],
                "totalNumberOfItems": 1
            }"#,
        )
        .expect("page with items");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].isrc.as_deref(), Some("NOG841735010"));
    }

    #[test]
    fn test_playlist_record_without_creator() {
        let playlist = TidalPlaylist {
            uuid: "abc".to_string(),
            title: "Editorial".to_string(),
            number_of_tracks: 1,
            creator: None,
        };

        let record = playlist_record(&playlist, String::new());
        assert_eq!(record.owner_id, "");
    }
}
