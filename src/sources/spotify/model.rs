//! The Web API subset this converter consumes, validated at the boundary.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    pub isrc: Option<String>,
    pub upc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyOwner {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    /// Absent for removed or local entries.
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyTracksPage {
    #[serde(default)]
    pub items: Vec<SpotifyPlaylistItem>,
    pub next: Option<String>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub owner: SpotifyOwner,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub tracks: SpotifyTracksPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTopTracks {
    #[serde(default)]
    pub tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifySearchTracks {
    #[serde(default)]
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchPage {
    #[serde(default)]
    pub tracks: SpotifySearchTracks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistsPage {
    #[serde(default)]
    pub items: Vec<SpotifyPlaylistRef>,
}

/// Episodes and shows share the fields the converter needs; the
/// fingerprint hides in the URI's last segment.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyEpisode {
    pub name: String,
    pub uri: String,
}
