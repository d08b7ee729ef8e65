//! Playlist metadata records: one row per playlist

use serde::{Deserialize, Serialize};

use super::lenient_int;

/// Raw playlist metadata as fetched from the catalog API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlaylist {
    pub playlist_id: String,
    #[serde(default)]
    pub playlist_name: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_int::deserialize")]
    pub followers: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int::deserialize")]
    pub total_tracks: Option<i64>,
    pub extraction_date: String,
}

/// Cleaned row as loaded into the playlists table. Missing follower and
/// track counts are filled with 0 during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub playlist_id: String,
    pub playlist_name: String,
    pub owner_id: String,
    pub followers: i64,
    pub total_tracks: i64,
    pub extraction_date: String,
    pub processed_at: String,
}
