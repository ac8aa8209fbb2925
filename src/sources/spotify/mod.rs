pub mod model;
pub mod token;

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
use token::SpotifyTokenTracker;

const API_BASE: &str = "https://api.spotify.com/v1";
const PAGE_LIMIT: u64 = 100;

/// Converts Spotify entities into their Deezer counterparts by ISRC/UPC.
pub struct SpotifySource {
    client: reqwest::Client,
    token_tracker: Arc<SpotifyTokenTracker>,
    resolver: Arc<FingerprintResolver>,
    market: String,
    item_concurrency: usize,
}

/// Pulls the `offset=` parameter out of a paging `next` URL; 0 means no
/// further page.
fn next_offset(next: Option<&str>) -> u64 {
    next.and_then(|url| url.split(['?', '&']).find_map(|p| p.strip_prefix("offset=")))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn utc_now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Reshapes Spotify playlist metadata into the catalog's playlist record.
fn playlist_record(playlist: &SpotifyPlaylist, created: String) -> Playlist {
    Playlist {
        id: playlist.id.clone(),
        title: playlist.name.clone(),
        owner_name: playlist.owner.id.clone(),
        owner_id: playlist.owner.id.clone(),
        picture: playlist
            .images
            .first()
            .map(|i| i.url.clone())
            .unwrap_or_default(),
        picture_type: "cover".to_string(),
        song_count: playlist.tracks.total,
        fan_count: 0,
        checksum: playlist.id.clone(),
        date_add: created.clone(),
        date_mod: created.clone(),
        date_create: created,
    }
}

impl SpotifySource {
    pub fn new(
        client: reqwest::Client,
        token_tracker: Arc<SpotifyTokenTracker>,
        resolver: Arc<FingerprintResolver>,
        market: String,
        item_concurrency: usize,
    ) -> Self {
        Self {
            client,
            token_tracker,
            resolver,
            market,
            item_concurrency,
        }
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ResolveError> {
        let token = self.token_tracker.get_token().await?;
        let url = format!("{}/{}", API_BASE, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn track_to_deezer(&self, id: &str) -> Result<Track, ResolveError> {
        let track: SpotifyTrack = self.api_get(&format!("tracks/{}", id), &[]).await?;
        self.resolver
            .by_isrc(&track.name, track.external_ids.isrc.as_deref())
            .await
    }

    pub async fn album_to_deezer(&self, id: &str) -> Result<(Album, Vec<Track>), ResolveError> {
        let album: SpotifyAlbum = self.api_get(&format!("albums/{}", id), &[]).await?;
        self.resolver
            .by_upc(&album.name, album.external_ids.upc.as_deref())
            .await
    }

    pub async fn episode_to_deezer(&self, id: &str) -> Result<Track, ResolveError> {
        let episode: SpotifyEpisode = self.api_get(&format!("episodes/{}", id), &[]).await?;
        let fingerprint = episode.uri.split(':').nth(2);
        self.resolver.by_isrc(&episode.name, fingerprint).await
    }

    pub async fn show_to_deezer(&self, id: &str) -> Result<Track, ResolveError> {
        let show: SpotifyEpisode = self.api_get(&format!("shows/{}", id), &[]).await?;
        let fingerprint = show.uri.split(':').nth(2);
        self.resolver.by_isrc(&show.name, fingerprint).await
    }

    /// First search hit wins; best-effort and deliberately not
    /// configurable.
    pub async fn search_to_deezer(&self, query: &str) -> Result<Track, ResolveError> {
        let page: SpotifySearchPage = self
            .api_get("search", &[("q", query), ("type", "track"), ("limit", "1")])
            .await?;

        let track = page
            .tracks
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound(format!("query: {}", query)))?;
        self.resolver
            .by_isrc(&track.name, track.external_ids.isrc.as_deref())
            .await
    }

    /// Delegates to the user's first playlist.
    pub async fn user_to_deezer(
        &self,
        id: &str,
        on_error: Option<ItemErrorHandler<'_>>,
    ) -> Result<(Playlist, Vec<Track>), ResolveError> {
        let page: SpotifyPlaylistsPage = self
            .api_get(&format!("users/{}/playlists", id), &[])
            .await?;

        let playlist = page
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound(format!("user: {}", id)))?;
        self.playlist_to_deezer(&playlist.id, on_error).await
    }

    /// Fetches the playlist, drains the remaining pages sequentially
    /// (each offset comes from the previous page's `next`), then fans out
    /// per-item ISRC resolution. Track position comes from the item's
    /// original index, not completion order.
    pub async fn playlist_to_deezer(
        &self,
        id: &str,
        on_error: Option<ItemErrorHandler<'_>>,
    ) -> Result<(Playlist, Vec<Track>), ResolveError> {
        let playlist: SpotifyPlaylist = self.api_get(&format!("playlists/{}", id), &[]).await?;

        let mut items = playlist.tracks.items.clone();
        let mut offset = next_offset(playlist.tracks.next.as_deref());
        while offset != 0 {
            let limit = PAGE_LIMIT.to_string();
            let offset_param = offset.to_string();
            let page: SpotifyTracksPage = self
                .api_get(
                    &format!("playlists/{}/tracks", id),
                    &[
                        ("limit", limit.as_str()),
                        ("offset", offset_param.as_str()),
                    ],
                )
                .await?;
            offset = next_offset(page.next.as_deref());
            items.extend(page.items);
        }

        let collected: Shared<Vec<Track>> = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let collected = collected.clone();
                let resolver = self.resolver.clone();
                async move {
                    let Some(entry) = item.track else {
                        return;
                    };
                    match resolver
                        .by_isrc(&entry.name, entry.external_ids.isrc.as_deref())
                        .await
                    {
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

    /// Top tracks only; the service caps this listing itself, so there is
    /// no pagination to drain.
    pub async fn artist_to_deezer(
        &self,
        id: &str,
        on_error: Option<ItemErrorHandler<'_>>,
    ) -> Result<Vec<Track>, ResolveError> {
        let top: SpotifyTopTracks = self
            .api_get(
                &format!("artists/{}/top-tracks", id),
                &[("market", self.market.as_str())],
            )
            .await?;

        let collected: Shared<Vec<Track>> = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<_> = top
            .tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| {
                let collected = collected.clone();
                let resolver = self.resolver.clone();
                async move {
                    match resolver
                        .by_isrc(&track.name, track.external_ids.isrc.as_deref())
                        .await
                    {
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
