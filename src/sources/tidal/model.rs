//! The v1 API subset this converter consumes.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TidalTrack {
    pub id: u64,
    pub title: String,
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TidalAlbum {
    pub id: u64,
    pub title: String,
    pub upc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TidalCreator {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalPlaylist {
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub number_of_tracks: u64,
    pub creator: Option<TidalCreator>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TidalPlaylistItem {
    /// Playlists can also carry videos; those have no usable item here.
    pub item: Option<TidalTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalPage<T> {
    // A plain `default` would demand `T: Default` from the derive.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_number_of_items: u64,
}
