pub mod spotify;
pub mod tidal;
pub mod youtube;

pub use spotify::SpotifySource;
pub use tidal::TidalSource;
pub use youtube::YoutubeSource;
