//! Transform stage: clean raw datasets and derive enrichment columns

use anyhow::Result;
use chrono::Local;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::models::{
    duration_min, has_genre, ArtistStreamRecord, PlaylistRecord, PlaylistStreamRecord,
    PopularityCategory, RawArtistTrack, RawPlaylist, RawPlaylistTrack,
};
use crate::pipeline::artifacts::{ArtifactStore, DatasetKind, Stage};

/// Cleans the three datasets. `processed_at` is stamped once at
/// construction so every row of one run carries the same timestamp.
pub struct Transformer {
    processed_at: String,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            processed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Fixed timestamp, for tests
    pub fn with_timestamp(processed_at: &str) -> Self {
        Self {
            processed_at: processed_at.to_string(),
        }
    }

    /// Clean artist-track rows: drop rows missing names, decode genres,
    /// bucket popularity, flag k-pop/j-pop. Numeric coercion failures are
    /// kept as None rather than filled.
    pub fn clean_artist_data(&self, rows: Vec<RawArtistTrack>) -> Vec<ArtistStreamRecord> {
        rows.into_iter()
            .filter_map(|row| {
                let artist_name = non_empty(row.artist_name)?;
                let track_name = non_empty(row.track_name)?;

                let genres: Vec<String> = row
                    .genres
                    .as_deref()
                    .and_then(|g| serde_json::from_str(g).ok())
                    .unwrap_or_default();

                Some(ArtistStreamRecord {
                    artist_id: row.artist_id,
                    artist_name,
                    track_name,
                    popularity: row.popularity,
                    album: row.album,
                    followers: row.followers,
                    popularity_category: row.popularity.map(PopularityCategory::from_popularity),
                    is_kpop: has_genre(&genres, "k-pop"),
                    is_jpop: has_genre(&genres, "j-pop"),
                    genres,
                    extraction_date: row.extraction_date,
                    processed_at: self.processed_at.clone(),
                })
            })
            .collect()
    }

    /// Clean playlist rows: fill missing counts with 0, dedup by
    /// playlist_id keeping the first occurrence
    pub fn clean_playlists_data(&self, rows: Vec<RawPlaylist>) -> Vec<PlaylistRecord> {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|row| seen.insert(row.playlist_id.clone()))
            .map(|row| PlaylistRecord {
                playlist_id: row.playlist_id,
                playlist_name: row.playlist_name.unwrap_or_default(),
                owner_id: row.owner_id.unwrap_or_default(),
                followers: row.followers.unwrap_or(0),
                total_tracks: row.total_tracks.unwrap_or(0),
                extraction_date: row.extraction_date,
                processed_at: self.processed_at.clone(),
            })
            .collect()
    }

    /// Clean playlist-track rows: drop rows missing names, fill missing
    /// numerics with 0, derive duration_min, dedup by (playlist_id,
    /// track_id) keeping the first occurrence
    pub fn clean_tracks_data(&self, rows: Vec<RawPlaylistTrack>) -> Vec<PlaylistStreamRecord> {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter_map(|row| {
                let track_name = non_empty(row.track_name)?;
                let artist_name = non_empty(row.artist_name)?;

                if !seen.insert((row.playlist_id.clone(), row.track_id.clone())) {
                    return None;
                }

                let duration_ms = row.duration_ms.unwrap_or(0);
                Some(PlaylistStreamRecord {
                    playlist_id: row.playlist_id,
                    track_id: row.track_id,
                    track_name,
                    artist_name,
                    popularity: row.popularity.unwrap_or(0),
                    album: row.album,
                    duration_ms,
                    extraction_date: row.extraction_date,
                    duration_min: duration_min(duration_ms),
                    processed_at: self.processed_at.clone(),
                })
            })
            .collect()
    }

    /// Run the full transform stage: read each raw artifact, clean it,
    /// write the cleaned artifact. An empty input dataset short-circuits
    /// to an empty output dataset.
    pub fn run(&self, store: &ArtifactStore) -> Result<()> {
        let raw = store.artifact(DatasetKind::ArtistStreams, Stage::Raw);
        let rows: Vec<RawArtistTrack> = read_or_empty(&raw, "artist streams")?;
        let cleaned = self.clean_artist_data(rows);
        store
            .artifact(DatasetKind::ArtistStreams, Stage::Cleaned)
            .write_records(&cleaned)?;
        info!("Cleaned artist streams: {} rows", cleaned.len());

        let raw = store.artifact(DatasetKind::Playlists, Stage::Raw);
        let rows: Vec<RawPlaylist> = read_or_empty(&raw, "playlists")?;
        let cleaned = self.clean_playlists_data(rows);
        store
            .artifact(DatasetKind::Playlists, Stage::Cleaned)
            .write_records(&cleaned)?;
        info!("Cleaned playlists: {} rows", cleaned.len());

        let raw = store.artifact(DatasetKind::PlaylistStreams, Stage::Raw);
        let rows: Vec<RawPlaylistTrack> = read_or_empty(&raw, "playlist tracks")?;
        let cleaned = self.clean_tracks_data(rows);
        store
            .artifact(DatasetKind::PlaylistStreams, Stage::Cleaned)
            .write_records(&cleaned)?;
        info!("Cleaned playlist tracks: {} rows", cleaned.len());

        Ok(())
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn read_or_empty<T: serde::de::DeserializeOwned>(
    artifact: &crate::pipeline::artifacts::Artifact,
    label: &str,
) -> Result<Vec<T>> {
    match artifact.read_records()? {
        Some(rows) => {
            if rows.is_empty() {
                info!("Raw {} dataset is empty; skipping cleaning", label);
            }
            Ok(rows)
        }
        None => {
            warn!("Raw {} artifact not found; treating as empty", label);
            Ok(Vec::new())
        }
    }
}
