//! The dispatcher: classifies a raw link, routes it to the catalog or a
//! converter, and assembles the final result set.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::api::CatalogApi;
use crate::catalog::fingerprint::FingerprintResolver;
use crate::catalog::gateway::GatewayClient;
use crate::catalog::types::{Album, Artist, Playlist, Track, merge_title_version};
use crate::common::errors::ResolveError;
use crate::common::http::HttpClient;
use crate::common::types::Shared;
use crate::configs::Config;
use crate::fanout::run_all;
use crate::link::{LinkClassifier, LinkKind, LinkRef};
use crate::sources::spotify::token::SpotifyTokenTracker;
use crate::sources::{SpotifySource, TidalSource, YoutubeSource};

/// The shape of a finished resolution, independent of which service the
/// link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Track,
    Album,
    Playlist,
    Artist,
    Episode,
    Show,
    Search,
    User,
}

/// Collection metadata attached to a result; single-track resolutions
/// carry none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityInfo {
    Album(Album),
    Playlist(Playlist),
    Artist(Artist),
    Empty {},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub link: LinkRef,
    pub kind: EntityKind,
    pub info: EntityInfo,
    pub tracks: Vec<Track>,
}

pub struct Resolver {
    classifier: LinkClassifier,
    api: Arc<CatalogApi>,
    spotify: SpotifySource,
    tidal: TidalSource,
    youtube: YoutubeSource,
    fanout_concurrency: usize,
}

impl Resolver {
    pub fn new(config: &Config) -> Result<Self, ResolveError> {
        let http = HttpClient::new()?;
        let deezer = config
            .deezer
            .as_ref()
            .ok_or_else(|| ResolveError::Config("deezer.arl is required".to_string()))?;

        let gateway = Arc::new(GatewayClient::new(http.clone(), &deezer.arl)?);
        let api = Arc::new(CatalogApi::new(gateway));
        let fingerprints = Arc::new(FingerprintResolver::new(http.clone(), api.clone()));
        let spotify_token = Arc::new(SpotifyTokenTracker::new(http.clone()));

        Ok(Self {
            classifier: LinkClassifier::new(http.clone(), spotify_token.clone()),
            api: api.clone(),
            spotify: SpotifySource::new(
                http.clone(),
                spotify_token,
                fingerprints.clone(),
                config.spotify.market.clone(),
                config.resolver.item_concurrency,
            ),
            tidal: TidalSource::new(
                http.clone(),
                fingerprints.clone(),
                config.tidal.token.clone(),
                config.tidal.country_code.clone(),
                config.resolver.item_concurrency,
            ),
            youtube: YoutubeSource::new(http, fingerprints, api),
            fanout_concurrency: config.resolver.fanout_concurrency,
        })
    }

    /// Resolves one raw link end to end. Collection failures on single
    /// items are logged and skipped; the error surfaced here sank the
    /// whole resolution.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedLink, ResolveError> {
        let link = self.classifier.classify(url, true).await?;
        info!("resolving {:?} {}", link.kind, link.id);

        let (kind, info, mut tracks) = match link.kind {
            LinkKind::Track => {
                let track = self.api.get_track(&link.id).await?;
                (EntityKind::Track, EntityInfo::Empty {}, vec![track])
            }
            LinkKind::Album => {
                let album = self.api.get_album(&link.id).await?;
                let list = self.api.get_album_tracks(&link.id).await?;
                (EntityKind::Album, EntityInfo::Album(album), list.data)
            }
            LinkKind::Playlist => {
                let playlist = self.api.get_playlist(&link.id).await?;
                let list = self.api.get_playlist_tracks(&link.id).await?;
                (
                    EntityKind::Playlist,
                    EntityInfo::Playlist(playlist),
                    list.data,
                )
            }
            LinkKind::Artist => {
                let artist = self.api.get_artist(&link.id).await?;
                let tracks = self.artist_discography_tracks(&artist).await?;
                (EntityKind::Artist, EntityInfo::Artist(artist), tracks)
            }
            LinkKind::SpotifyTrack => {
                let track = self.spotify.track_to_deezer(&link.id).await?;
                (EntityKind::Track, EntityInfo::Empty {}, vec![track])
            }
            LinkKind::SpotifyAlbum => {
                let (album, tracks) = self.spotify.album_to_deezer(&link.id).await?;
                (EntityKind::Album, EntityInfo::Album(album), tracks)
            }
            LinkKind::SpotifyPlaylist => {
                let (playlist, tracks) = self.spotify.playlist_to_deezer(&link.id, None).await?;
                (
                    EntityKind::Playlist,
                    EntityInfo::Playlist(playlist),
                    tracks,
                )
            }
            LinkKind::SpotifyArtist => {
                let tracks = self.spotify.artist_to_deezer(&link.id, None).await?;
                (EntityKind::Artist, EntityInfo::Empty {}, tracks)
            }
            LinkKind::SpotifyEpisode => {
                let track = self.spotify.episode_to_deezer(&link.id).await?;
                (EntityKind::Episode, EntityInfo::Empty {}, vec![track])
            }
            LinkKind::SpotifyShow => {
                let track = self.spotify.show_to_deezer(&link.id).await?;
                (EntityKind::Show, EntityInfo::Empty {}, vec![track])
            }
            LinkKind::SpotifySearch => {
                let track = self.spotify.search_to_deezer(&link.id).await?;
                (EntityKind::Search, EntityInfo::Empty {}, vec![track])
            }
            LinkKind::SpotifyUser => {
                let (_, tracks) = self.spotify.user_to_deezer(&link.id, None).await?;
                (EntityKind::User, EntityInfo::Empty {}, tracks)
            }
            LinkKind::TidalTrack => {
                let track = self.tidal.track_to_deezer(&link.id).await?;
                (EntityKind::Track, EntityInfo::Empty {}, vec![track])
            }
            LinkKind::TidalAlbum => {
                let (album, tracks) = self.tidal.album_to_deezer(&link.id).await?;
                (EntityKind::Album, EntityInfo::Album(album), tracks)
            }
            LinkKind::TidalPlaylist => {
                let (playlist, tracks) = self.tidal.playlist_to_deezer(&link.id, None).await?;
                (
                    EntityKind::Playlist,
                    EntityInfo::Playlist(playlist),
                    tracks,
                )
            }
            LinkKind::TidalArtist => {
                let tracks = self.tidal.artist_to_deezer(&link.id, None).await?;
                (EntityKind::Artist, EntityInfo::Empty {}, tracks)
            }
            LinkKind::YoutubeTrack => {
                let track = self.youtube.track_to_deezer(&link.id).await?;
                (EntityKind::Track, EntityInfo::Empty {}, vec![track])
            }
        };

        for track in &mut tracks {
            merge_title_version(track);
        }

        Ok(ResolvedLink {
            link,
            kind,
            info,
            tracks,
        })
    }

    /// Walks the artist's discography and collects their own tracks from
    /// every release they are credited on. Guest releases (no membership
    /// in the album's artist list) are skipped before the fan-out; other
    /// artists' tracks on kept releases are filtered after. Results keep
    /// discography order regardless of completion order.
    async fn artist_discography_tracks(&self, artist: &Artist) -> Result<Vec<Track>, ResolveError> {
        let discography = self.api.get_discography(&artist.id).await?;

        let collected: Shared<Vec<(usize, Vec<Track>)>> = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<_> = discography
            .data
            .into_iter()
            .filter(|album| album.artists.iter().any(|a| a.id == artist.id))
            .enumerate()
            .map(|(index, album)| {
                let collected = collected.clone();
                let api = self.api.clone();
                let artist_id = artist.id.clone();
                async move {
                    match api.get_album_tracks(&album.id).await {
                        Ok(list) => {
                            let own: Vec<Track> = list
                                .data
                                .into_iter()
                                .filter(|track| track.artist_id == artist_id)
                                .collect();
                            collected.lock().await.push((index, own));
                        }
                        Err(err) => warn!("skipping album {}: {}", album.id, err),
                    }
                }
            })
            .collect();
        run_all(tasks, self.fanout_concurrency).await;

        let mut groups = std::mem::take(&mut *collected.lock().await);
        groups.sort_by_key(|(index, _)| *index);
        Ok(groups.into_iter().flat_map(|(_, tracks)| tracks).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(EntityKind::Playlist).unwrap(),
            serde_json::json!("playlist")
        );
        assert_eq!(
            serde_json::to_value(EntityKind::Track).unwrap(),
            serde_json::json!("track")
        );
    }

    #[test]
    fn test_empty_info_serializes_as_empty_object() {
        let info = EntityInfo::Empty {};
        assert_eq!(serde_json::to_value(&info).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_resolver_requires_deezer_credentials() {
        let config = Config::default();
        let err = Resolver::new(&config).err().unwrap();
        assert!(matches!(err, ResolveError::Config(_)));
    }

    #[test]
    fn test_resolved_link_shape() {
        let resolved = ResolvedLink {
            link: LinkRef {
                id: "3135556".to_string(),
                kind: LinkKind::Track,
            },
            kind: EntityKind::Track,
            info: EntityInfo::Empty {},
            tracks: Vec::new(),
        };

        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["link"]["type"], "track");
        assert_eq!(json["kind"], "track");
        assert_eq!(json["info"], serde_json::json!({}));
        assert!(json["tracks"].as_array().unwrap().is_empty());
    }
}
