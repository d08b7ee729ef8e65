//! Spotify Web API source client
//!
//! The extractor talks to the catalog through the [`CatalogSource`] trait
//! so the production client can be swapped for a test double. The client
//! is constructed explicitly by the caller; there is no process-global
//! instance.

mod client;

pub use client::{
    AlbumRef, ArtistInfo, ArtistRef, FollowerCount, OwnerRef, PageItem, PlaylistInfo,
    PlaylistTrackItem, SourceError, SpotifyClient, TopTrack, TrackPage, TrackTotals,
};

use async_trait::async_trait;

/// Seam between the extractor and the catalog API
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch artist metadata (name, follower count, genres)
    async fn artist(&self, artist_id: &str) -> Result<ArtistInfo, SourceError>;

    /// Fetch the artist's top tracks
    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<TopTrack>, SourceError>;

    /// Fetch playlist metadata
    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistInfo, SourceError>;

    /// Fetch one page of playlist tracks. `cursor` is the opaque "next"
    /// token from the previous page, or None for the first page.
    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<TrackPage, SourceError>;
}
