use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::catalog::gateway::GatewayClient;
use crate::catalog::types::{Album, Artist, DiscographyList, Playlist, Track, TrackList};
use crate::common::errors::ResolveError;

/// Typed single-entity and collection fetchers over the gateway.
pub struct CatalogApi {
    gateway: Arc<GatewayClient>,
}

impl CatalogApi {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }

    pub async fn get_track(&self, id: &str) -> Result<Track, ResolveError> {
        let results = self
            .gateway
            .request("song.getData", json!({ "sng_id": id }))
            .await?;
        parse("song.getData", results)
    }

    pub async fn get_album(&self, id: &str) -> Result<Album, ResolveError> {
        let results = self
            .gateway
            .request("album.getData", json!({ "alb_id": id }))
            .await?;
        parse("album.getData", results)
    }

    pub async fn get_album_tracks(&self, id: &str) -> Result<TrackList, ResolveError> {
        let results = self
            .gateway
            .request("song.getListByAlbum", json!({ "alb_id": id, "nb": -1 }))
            .await?;
        parse("song.getListByAlbum", results)
    }

    pub async fn get_playlist(&self, id: &str) -> Result<Playlist, ResolveError> {
        let results = self
            .gateway
            .request("playlist.getData", json!({ "playlist_id": id }))
            .await?;
        parse("playlist.getData", results)
    }

    pub async fn get_playlist_tracks(&self, id: &str) -> Result<TrackList, ResolveError> {
        let results = self
            .gateway
            .request(
                "playlist.getSongs",
                json!({ "playlist_id": id, "nb": -1, "start": 0 }),
            )
            .await?;
        parse("playlist.getSongs", results)
    }

    pub async fn get_artist(&self, id: &str) -> Result<Artist, ResolveError> {
        let results = self
            .gateway
            .request("artist.getData", json!({ "art_id": id }))
            .await?;
        parse("artist.getData", results)
    }

    pub async fn get_discography(&self, artist_id: &str) -> Result<DiscographyList, ResolveError> {
        let results = self
            .gateway
            .request(
                "album.getDiscography",
                json!({
                    "art_id": artist_id,
                    "filter_role_id": [0],
                    "nb": 500,
                    "nb_songs": -1,
                    "start": 0
                }),
            )
            .await?;
        parse("album.getDiscography", results)
    }
}

fn parse<T: DeserializeOwned>(method: &'static str, results: Value) -> Result<T, ResolveError> {
    serde_json::from_value(results).map_err(|e| ResolveError::Schema(method, e.to_string()))
}
