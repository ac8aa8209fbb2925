//! Turns raw URLs and URIs into typed, service-qualified references. Each
//! service's grammar is an explicit table of pattern/kind pairs so new
//! link shapes are additive.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::errors::ResolveError;
use crate::sources::spotify::token::SpotifyTokenTracker;

/// Service-qualified entity kinds; anything outside this set is a
/// classification failure, never a partial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    Track,
    Album,
    Playlist,
    Artist,
    SpotifyTrack,
    SpotifyAlbum,
    SpotifyPlaylist,
    SpotifyArtist,
    SpotifyEpisode,
    SpotifyShow,
    SpotifySearch,
    SpotifyUser,
    TidalTrack,
    TidalAlbum,
    TidalPlaylist,
    TidalArtist,
    YoutubeTrack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

struct ServiceGrammar {
    pattern: Regex,
    kinds: &'static [(&'static str, LinkKind)],
}

impl ServiceGrammar {
    fn extract(&self, url: &str) -> Option<LinkRef> {
        let caps = self.pattern.captures(url)?;
        let kind_name = caps.get(1)?.as_str();
        let id = caps.get(2)?.as_str();
        let kind = self
            .kinds
            .iter()
            .find(|(name, _)| *name == kind_name)
            .map(|(_, kind)| *kind)?;
        if id.is_empty() {
            return None;
        }
        Some(LinkRef {
            id: id.to_string(),
            kind,
        })
    }
}

const DEEZER_KINDS: &[(&str, LinkKind)] = &[
    ("track", LinkKind::Track),
    ("album", LinkKind::Album),
    // Audiobooks resolve through the album pipeline.
    ("audiobook", LinkKind::Album),
    ("playlist", LinkKind::Playlist),
    ("artist", LinkKind::Artist),
];

const SPOTIFY_KINDS: &[(&str, LinkKind)] = &[
    ("track", LinkKind::SpotifyTrack),
    ("album", LinkKind::SpotifyAlbum),
    ("playlist", LinkKind::SpotifyPlaylist),
    ("artist", LinkKind::SpotifyArtist),
    ("episode", LinkKind::SpotifyEpisode),
    ("show", LinkKind::SpotifyShow),
    ("search", LinkKind::SpotifySearch),
    ("user", LinkKind::SpotifyUser),
];

const TIDAL_KINDS: &[(&str, LinkKind)] = &[
    ("track", LinkKind::TidalTrack),
    ("album", LinkKind::TidalAlbum),
    ("playlist", LinkKind::TidalPlaylist),
    ("artist", LinkKind::TidalArtist),
];

pub struct LinkClassifier {
    http: reqwest::Client,
    spotify_token: Arc<SpotifyTokenTracker>,
    deezer: ServiceGrammar,
    spotify: ServiceGrammar,
    tidal: ServiceGrammar,
}

impl LinkClassifier {
    pub fn new(http: reqwest::Client, spotify_token: Arc<SpotifyTokenTracker>) -> Self {
        Self {
            http,
            spotify_token,
            deezer: ServiceGrammar {
                pattern: Regex::new(
                    r"deezer\.com/(?:[a-z]+(?:-[a-z]+)?/)?(track|album|audiobook|playlist|artist)/(\d+)",
                )
                .unwrap(),
                kinds: DEEZER_KINDS,
            },
            spotify: ServiceGrammar {
                pattern: Regex::new(
                    r"open\.spotify\.com/(?:intl-[a-zA-Z]+(?:-[a-zA-Z]+)?/)?(track|album|playlist|artist|episode|show|search|user)/([^/?#]+)",
                )
                .unwrap(),
                kinds: SPOTIFY_KINDS,
            },
            tidal: ServiceGrammar {
                pattern: Regex::new(
                    // UUID before digits: alternation is leftmost-first, and
                    // a UUID starting with digits must not match as a bare
                    // digit run.
                    r"tidal\.com/(?:browse/)?(track|album|playlist|artist)/([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}|\d+)",
                )
                .unwrap(),
                kinds: TIDAL_KINDS,
            },
        }
    }

    /// Classifies a raw link. With `resolve_service_token` set, a Spotify
    /// match also warms that service's anonymous token (required before
    /// any call into its API). Network is only touched for short-link
    /// redirects and that token warm-up.
    pub async fn classify(
        &self,
        url: &str,
        resolve_service_token: bool,
    ) -> Result<LinkRef, ResolveError> {
        let url = rewrite_compact_uri(url);

        if url.contains("deezer") {
            let url = if url.contains("page.link") {
                self.resolve_short_link(&url).await?
            } else {
                url
            };
            return self
                .deezer
                .extract(&url)
                .ok_or(ResolveError::Classification(url));
        }

        if url.contains("spotify") {
            let link = self
                .spotify
                .extract(&url)
                .ok_or(ResolveError::Classification(url))?;
            if resolve_service_token {
                self.spotify_token.get_token().await?;
            }
            return Ok(link);
        }

        if url.contains("tidal") {
            return self
                .tidal
                .extract(&url)
                .ok_or(ResolveError::Classification(url));
        }

        if url.contains("youtu.be") {
            let id = url
                .split(['?', '#'])
                .next()
                .unwrap_or(&url)
                .rsplit('/')
                .next()
                .unwrap_or("")
                .to_string();
            if id.is_empty() {
                return Err(ResolveError::Classification(url));
            }
            return Ok(LinkRef {
                id,
                kind: LinkKind::YoutubeTrack,
            });
        }

        if url.contains("youtube") {
            let id = url
                .split("v=")
                .nth(1)
                .map(|rest| rest.split('&').next().unwrap_or(rest))
                .unwrap_or("")
                .to_string();
            if id.is_empty() {
                return Err(ResolveError::Classification(url));
            }
            return Ok(LinkRef {
                id,
                kind: LinkKind::YoutubeTrack,
            });
        }

        Err(ResolveError::Classification(url))
    }

    /// Substitutes the short link's redirect target before classification
    /// continues.
    async fn resolve_short_link(&self, url: &str) -> Result<String, ResolveError> {
        let response = self.http.head(url).send().await?;
        let resolved = response.url().to_string();
        debug!("short link {} resolved to {}", url, resolved);
        Ok(resolved)
    }
}

/// `spotify:track:abc` and friends become their web URL equivalent.
fn rewrite_compact_uri(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("spotify:") {
        let mut parts = rest.splitn(2, ':');
        if let (Some(kind), Some(id)) = (parts.next(), parts.next()) {
            return format!("https://open.spotify.com/{}/{}", kind, id);
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::http::HttpClient;

    fn classifier() -> LinkClassifier {
        let http = HttpClient::new().expect("client");
        let token = Arc::new(SpotifyTokenTracker::new(http.clone()));
        LinkClassifier::new(http, token)
    }

    async fn classify(url: &str) -> Result<LinkRef, ResolveError> {
        classifier().classify(url, false).await
    }

    #[tokio::test]
    async fn test_spotify_track_link() {
        let link = classify("https://open.spotify.com/track/abc123").await.unwrap();
        assert_eq!(link.kind, LinkKind::SpotifyTrack);
        assert_eq!(link.id, "abc123");

        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "spotify-track");
        assert_eq!(json["id"], "abc123");
    }

    #[tokio::test]
    async fn test_spotify_intl_segment_and_query() {
        let link = classify("https://open.spotify.com/intl-de/album/4m2880jivSbbyEGAKfITCa?si=x")
            .await
            .unwrap();
        assert_eq!(link.kind, LinkKind::SpotifyAlbum);
        assert_eq!(link.id, "4m2880jivSbbyEGAKfITCa");
    }

    #[tokio::test]
    async fn test_spotify_compact_uri_is_rewritten() {
        let link = classify("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").await.unwrap();
        assert_eq!(link.kind, LinkKind::SpotifyPlaylist);
        assert_eq!(link.id, "37i9dQZF1DXcBWIGoYBM5M");
    }

    #[tokio::test]
    async fn test_deezer_links_with_and_without_locale() {
        let link = classify("https://www.deezer.com/track/3135556").await.unwrap();
        assert_eq!(link.kind, LinkKind::Track);
        assert_eq!(link.id, "3135556");

        let link = classify("https://www.deezer.com/en-gb/album/302127").await.unwrap();
        assert_eq!(link.kind, LinkKind::Album);
        assert_eq!(link.id, "302127");
    }

    #[tokio::test]
    async fn test_deezer_audiobook_routes_as_album() {
        let link = classify("https://www.deezer.com/audiobook/123456").await.unwrap();
        assert_eq!(link.kind, LinkKind::Album);
    }

    #[tokio::test]
    async fn test_youtube_id_is_truncated_at_ampersand() {
        let link = classify("https://www.youtube.com/watch?v=XYZ&list=PL1").await.unwrap();
        assert_eq!(link.kind, LinkKind::YoutubeTrack);
        assert_eq!(link.id, "XYZ");

        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "youtube-track");
    }

    #[tokio::test]
    async fn test_youtube_short_domain_takes_last_segment() {
        let link = classify("https://youtu.be/dQw4w9WgXcQ?t=43").await.unwrap();
        assert_eq!(link.kind, LinkKind::YoutubeTrack);
        assert_eq!(link.id, "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_tidal_numeric_and_uuid_ids() {
        let link = classify("https://tidal.com/browse/track/77646170").await.unwrap();
        assert_eq!(link.kind, LinkKind::TidalTrack);
        assert_eq!(link.id, "77646170");

        let link = classify(
            "https://listen.tidal.com/playlist/7ce7df52-6a9d-4c3e-99f7-9a72b0f0f0ab",
        )
        .await
        .unwrap();
        assert_eq!(link.kind, LinkKind::TidalPlaylist);
        assert_eq!(link.id, "7ce7df52-6a9d-4c3e-99f7-9a72b0f0f0ab");
    }

    #[tokio::test]
    async fn test_unknown_service_fails_fast() {
        let err = classify("https://example.com/track/123").await.unwrap_err();
        assert!(matches!(err, ResolveError::Classification(_)));
    }

    #[tokio::test]
    async fn test_recognized_service_with_bad_shape_fails() {
        let err = classify("https://www.deezer.com/profile/me").await.unwrap_err();
        assert!(matches!(err, ResolveError::Classification(_)));
    }

    #[tokio::test]
    async fn test_classification_is_deterministic() {
        let first = classify("https://open.spotify.com/track/abc123").await.unwrap();
        let second = classify("https://open.spotify.com/track/abc123").await.unwrap();
        assert_eq!(first, second);
    }
}
