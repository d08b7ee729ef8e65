//! Extract stage: fetch catalog metadata and write raw artifacts

use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::{RawArtistTrack, RawPlaylist, RawPlaylistTrack};
use crate::pipeline::artifacts::{ArtifactStore, DatasetKind, Stage};
use crate::spotify::CatalogSource;

/// Pause after each artist fetch to respect API rate limits
pub const ARTIST_FETCH_DELAY: Duration = Duration::from_millis(500);
/// Shorter pause after each pagination page
pub const PAGE_FETCH_DELAY: Duration = Duration::from_millis(100);

/// Drives the catalog source and assembles the three raw datasets.
/// A failure on one ID is logged and skipped; the loop continues.
pub struct Extractor<'a> {
    source: &'a dyn CatalogSource,
    artist_delay: Duration,
    page_delay: Duration,
}

impl<'a> Extractor<'a> {
    pub fn new(source: &'a dyn CatalogSource) -> Self {
        Self {
            source,
            artist_delay: ARTIST_FETCH_DELAY,
            page_delay: PAGE_FETCH_DELAY,
        }
    }

    /// Override the inter-request delays (tests use zero)
    pub fn with_delays(mut self, artist_delay: Duration, page_delay: Duration) -> Self {
        self.artist_delay = artist_delay;
        self.page_delay = page_delay;
        self
    }

    /// One artist-track row per (artist, top track) pair, with artist
    /// fields denormalized onto every row
    pub async fn extract_artist_data(&self, artist_ids: &[String]) -> Vec<RawArtistTrack> {
        let extraction_date = today();
        let mut rows = Vec::new();

        for artist_id in artist_ids {
            let result = async {
                let artist = self.source.artist(artist_id).await?;
                let top_tracks = self.source.artist_top_tracks(artist_id).await?;
                Ok::<_, crate::spotify::SourceError>((artist, top_tracks))
            }
            .await;

            match result {
                Ok((artist, top_tracks)) => {
                    let genres = serde_json::to_string(&artist.genres).unwrap_or_default();
                    for track in top_tracks {
                        rows.push(RawArtistTrack {
                            artist_id: artist_id.clone(),
                            artist_name: Some(artist.name.clone()),
                            track_name: Some(track.name),
                            popularity: Some(track.popularity),
                            album: track.album.map(|a| a.name),
                            followers: Some(artist.followers.total),
                            genres: Some(genres.clone()),
                            extraction_date: extraction_date.clone(),
                        });
                    }
                }
                Err(e) => {
                    error!("Error extracting data for artist {}: {}", artist_id, e);
                }
            }

            tokio::time::sleep(self.artist_delay).await;
        }

        rows
    }

    /// One playlist row per playlist plus one track row per non-null
    /// playlist entry, following the "next" cursor until exhausted
    pub async fn extract_playlist_data(
        &self,
        playlist_ids: &[String],
    ) -> (Vec<RawPlaylist>, Vec<RawPlaylistTrack>) {
        let extraction_date = today();
        let mut playlists = Vec::new();
        let mut playlist_tracks = Vec::new();

        for playlist_id in playlist_ids {
            match self.extract_one_playlist(playlist_id, &extraction_date).await {
                Ok((playlist, tracks)) => {
                    playlists.push(playlist);
                    playlist_tracks.extend(tracks);
                }
                Err(e) => {
                    error!("Error extracting data for playlist {}: {}", playlist_id, e);
                }
            }
        }

        (playlists, playlist_tracks)
    }

    async fn extract_one_playlist(
        &self,
        playlist_id: &str,
        extraction_date: &str,
    ) -> Result<(RawPlaylist, Vec<RawPlaylistTrack>), crate::spotify::SourceError> {
        let info = self.source.playlist(playlist_id).await?;

        let playlist = RawPlaylist {
            playlist_id: playlist_id.to_string(),
            playlist_name: Some(info.name),
            owner_id: Some(info.owner.id),
            followers: Some(info.followers.map(|f| f.total).unwrap_or(0)),
            total_tracks: Some(info.tracks.total),
            extraction_date: extraction_date.to_string(),
        };

        let mut tracks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .source
                .playlist_tracks_page(playlist_id, cursor.as_deref())
                .await?;

            for item in page.items {
                // null entries are tracks removed from the catalog
                let Some(track) = item.track else { continue };
                let Some(track_id) = track.id else { continue };

                tracks.push(RawPlaylistTrack {
                    playlist_id: playlist_id.to_string(),
                    track_id,
                    track_name: Some(track.name),
                    artist_name: Some(
                        track
                            .artists
                            .first()
                            .map(|a| a.name.clone())
                            .unwrap_or_else(|| "Unknown".to_string()),
                    ),
                    popularity: Some(track.popularity),
                    album: track.album.map(|a| a.name),
                    duration_ms: Some(track.duration_ms),
                    extraction_date: extraction_date.to_string(),
                });
            }

            match page.next {
                Some(next) => {
                    cursor = Some(next);
                    tokio::time::sleep(self.page_delay).await;
                }
                None => break,
            }
        }

        Ok((playlist, tracks))
    }

    /// Run the full extract stage and write the three raw artifacts.
    /// Empty ID lists or all-IDs-failed produce empty (not absent)
    /// artifacts so downstream stages see "nothing to process".
    pub async fn run(
        &self,
        store: &ArtifactStore,
        artist_ids: &[String],
        playlist_ids: &[String],
    ) -> Result<()> {
        info!(
            "Extracting catalog data for {} artists and {} playlists",
            artist_ids.len(),
            playlist_ids.len()
        );

        let artist_rows = self.extract_artist_data(artist_ids).await;
        if artist_rows.is_empty() {
            warn!("No artist data extracted; check artist IDs or API access");
        }
        store
            .artifact(DatasetKind::ArtistStreams, Stage::Raw)
            .write_records(&artist_rows)?;
        info!("Wrote {} artist stream rows", artist_rows.len());

        let (playlists, playlist_tracks) = self.extract_playlist_data(playlist_ids).await;
        if playlists.is_empty() {
            warn!("No playlist metadata extracted");
        }
        store
            .artifact(DatasetKind::Playlists, Stage::Raw)
            .write_records(&playlists)?;
        info!("Wrote {} playlist rows", playlists.len());

        store
            .artifact(DatasetKind::PlaylistStreams, Stage::Raw)
            .write_records(&playlist_tracks)?;
        info!("Wrote {} playlist track rows", playlist_tracks.len());

        Ok(())
    }
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
