//! Typed gw-light payloads. Responses are validated into these shapes
//! immediately on receipt; nothing downstream touches raw JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "SNG_ID")]
    pub id: String,
    #[serde(rename = "SNG_TITLE")]
    pub title: String,
    #[serde(rename = "VERSION", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "ART_ID", default)]
    pub artist_id: String,
    #[serde(rename = "ART_NAME", default)]
    pub artist_name: String,
    #[serde(rename = "ALB_ID", default)]
    pub album_id: String,
    #[serde(rename = "ALB_TITLE", default)]
    pub album_title: String,
    #[serde(rename = "ALB_PICTURE", default)]
    pub album_picture: String,
    #[serde(rename = "DURATION", default)]
    pub duration: String,
    #[serde(rename = "ISRC", default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(
        rename = "TRACK_POSITION",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub track_position: Option<u32>,
    #[serde(rename = "ARTISTS", default, skip_serializing_if = "Vec::is_empty")]
    pub artists: Vec<AlbumArtist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "ALB_ID")]
    pub id: String,
    #[serde(rename = "ALB_TITLE")]
    pub title: String,
    #[serde(rename = "ALB_PICTURE", default)]
    pub picture: String,
    #[serde(rename = "ART_ID", default)]
    pub artist_id: String,
    #[serde(rename = "ART_NAME", default)]
    pub artist_name: String,
    #[serde(rename = "UPC", default, skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    #[serde(rename = "NUMBER_TRACK", default)]
    pub number_track: String,
    #[serde(
        rename = "PHYSICAL_RELEASE_DATE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "PLAYLIST_ID")]
    pub id: String,
    #[serde(rename = "TITLE")]
    pub title: String,
    #[serde(rename = "PARENT_USERNAME", default)]
    pub owner_name: String,
    #[serde(rename = "PARENT_USER_ID", default)]
    pub owner_id: String,
    #[serde(rename = "PLAYLIST_PICTURE", default)]
    pub picture: String,
    #[serde(rename = "PICTURE_TYPE", default)]
    pub picture_type: String,
    #[serde(rename = "NB_SONG", default)]
    pub song_count: u64,
    #[serde(rename = "NB_FAN", default)]
    pub fan_count: u64,
    #[serde(rename = "CHECKSUM", default)]
    pub checksum: String,
    #[serde(rename = "DATE_ADD", default)]
    pub date_add: String,
    #[serde(rename = "DATE_MOD", default)]
    pub date_mod: String,
    #[serde(rename = "DATE_CREATE", default)]
    pub date_create: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    #[serde(rename = "ART_ID")]
    pub id: String,
    #[serde(rename = "ART_NAME")]
    pub name: String,
    #[serde(rename = "ART_PICTURE", default)]
    pub picture: String,
    #[serde(rename = "NB_FAN", default)]
    pub fan_count: u64,
}

/// List envelope used by `song.getListByAlbum` and `playlist.getSongs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackList {
    #[serde(default)]
    pub data: Vec<Track>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumArtist {
    #[serde(rename = "ART_ID")]
    pub id: String,
}

/// One release out of `album.getDiscography`; only the fields the artist
/// fan-out needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscographyAlbum {
    #[serde(rename = "ALB_ID")]
    pub id: String,
    #[serde(rename = "ALB_TITLE", default)]
    pub title: String,
    #[serde(rename = "ARTISTS", default)]
    pub artists: Vec<AlbumArtist>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscographyList {
    #[serde(default)]
    pub data: Vec<DiscographyAlbum>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total: u64,
}

/// Appends the version tag ("(Remastered)", "(Deluxe Edition)", ...) to the
/// title unless the title already carries it. Applied once over every
/// finished result set; safe to apply again.
pub fn merge_title_version(track: &mut Track) {
    if let Some(version) = &track.version {
        let version = version.trim();
        if !version.is_empty() && !track.title.contains(version) {
            track.title = format!("{} {}", track.title, version);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track(title: &str, version: Option<&str>) -> Track {
        Track {
            id: "3135556".to_string(),
            title: title.to_string(),
            version: version.map(|s| s.to_string()),
            artist_id: "27".to_string(),
            artist_name: "Daft Punk".to_string(),
            album_id: "302127".to_string(),
            album_title: "Discovery".to_string(),
            album_picture: "2e018122cb56986277102d2041a592c8".to_string(),
            duration: "223".to_string(),
            isrc: Some("GBDUW0000059".to_string()),
            track_position: None,
            artists: Vec::new(),
        }
    }

    #[test]
    fn test_merge_appends_version_once() {
        let mut track = sample_track("Harder, Better, Faster, Stronger", Some("(Remastered)"));
        merge_title_version(&mut track);
        assert_eq!(
            track.title,
            "Harder, Better, Faster, Stronger (Remastered)"
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut track = sample_track("One More Time", Some("(Club Mix)"));
        merge_title_version(&mut track);
        let once = track.title.clone();
        merge_title_version(&mut track);
        assert_eq!(track.title, once);
    }

    #[test]
    fn test_merge_skips_version_already_in_title() {
        let mut track = sample_track("Aerodynamic (Daft Punk Remix)", Some("(Daft Punk Remix)"));
        merge_title_version(&mut track);
        assert_eq!(track.title, "Aerodynamic (Daft Punk Remix)");
    }

    #[test]
    fn test_merge_ignores_blank_version() {
        let mut track = sample_track("Voyager", Some("  "));
        merge_title_version(&mut track);
        assert_eq!(track.title, "Voyager");
    }

    #[test]
    fn test_track_deserializes_gw_field_names() {
        let track: Track = serde_json::from_str(
            r#"{
                "SNG_ID": "3135556",
                "SNG_TITLE": "Harder, Better, Faster, Stronger",
                "VERSION": "",
                "ART_ID": "27",
                "ART_NAME": "Daft Punk",
                "ALB_ID": "302127",
                "ALB_TITLE": "Discovery",
                "ALB_PICTURE": "2e018122cb56986277102d2041a592c8",
                "DURATION": "223",
                "ISRC": "GBDUW0000059"
            }"#,
        )
        .expect("gw track payload");

        assert_eq!(track.id, "3135556");
        assert_eq!(track.artist_name, "Daft Punk");
        assert_eq!(track.isrc.as_deref(), Some("GBDUW0000059"));
        assert_eq!(track.track_position, None);
    }

    #[test]
    fn test_discography_album_membership_fields() {
        let album: DiscographyAlbum = serde_json::from_str(
            r#"{
                "ALB_ID": "302127",
                "ALB_TITLE": "Discovery",
                "ARTISTS": [{"ART_ID": "27"}, {"ART_ID": "103"}]
            }"#,
        )
        .expect("discography payload");

        assert!(album.artists.iter().any(|a| a.id == "27"));
        assert!(!album.artists.iter().any(|a| a.id == "999"));
    }
}
