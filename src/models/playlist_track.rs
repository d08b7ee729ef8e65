//! Playlist track records: one row per (playlist, track) pair

use serde::{Deserialize, Serialize};

use super::lenient_int;

/// Raw playlist track row as fetched from the catalog API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlaylistTrack {
    pub playlist_id: String,
    pub track_id: String,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int::deserialize")]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, deserialize_with = "lenient_int::deserialize")]
    pub duration_ms: Option<i64>,
    pub extraction_date: String,
}

/// Cleaned row as loaded into the playlist_streams table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistStreamRecord {
    pub playlist_id: String,
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub popularity: i64,
    pub album: Option<String>,
    pub duration_ms: i64,
    pub extraction_date: String,
    pub duration_min: f64,
    pub processed_at: String,
}

/// Track duration in minutes, rounded to 2 decimal places
pub fn duration_min(duration_ms: i64) -> f64 {
    (duration_ms as f64 / 60000.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_min_rounds_to_two_decimals() {
        assert_eq!(duration_min(60000), 1.0);
        assert_eq!(duration_min(125000), 2.08);
        assert_eq!(duration_min(215000), 3.58);
        assert_eq!(duration_min(0), 0.0);
    }
}
