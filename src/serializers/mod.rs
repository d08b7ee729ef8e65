//! Response serializers for the read API
//!
//! Every row fetched from the warehouse is validated against the column
//! contract before it is returned: required fields must be present and
//! ranged fields must be in range. A failure on any row turns the whole
//! response into a client error carrying the collected messages, matching
//! the dashboard contract.

use serde::Serialize;

use crate::db::{ArtistStreamRow, PlaylistRow, PlaylistStreamRow};

#[derive(Debug, Clone, Serialize)]
pub struct ArtistStreamResponse {
    pub artist_id: String,
    pub artist_name: String,
    pub track_name: String,
    pub popularity: Option<i64>,
    pub album: Option<String>,
    pub followers: Option<i64>,
    pub genres: Vec<String>,
    pub extraction_date: String,
    pub popularity_category: Option<String>,
    pub is_kpop: bool,
    pub is_jpop: bool,
    pub processed_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistResponse {
    pub playlist_id: String,
    pub playlist_name: String,
    pub owner_id: String,
    pub followers: i64,
    pub total_tracks: i64,
    pub extraction_date: String,
    pub processed_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistStreamResponse {
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

/// Collects "row N: field X ..." messages while pulling required fields
struct RowCheck<'a> {
    index: usize,
    errors: &'a mut Vec<String>,
}

impl<'a> RowCheck<'a> {
    fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.errors
                .push(format!("row {}: field '{}' is required", self.index, field));
        }
        value
    }

    fn in_range(&mut self, field: &str, value: Option<i64>, min: i64, max: i64) {
        if let Some(v) = value {
            if v < min || v > max {
                self.errors.push(format!(
                    "row {}: field '{}' value {} outside [{}, {}]",
                    self.index, field, v, min, max
                ));
            }
        }
    }

    fn positive(&mut self, field: &str, value: Option<i64>) {
        if let Some(v) = value {
            if v <= 0 {
                self.errors.push(format!(
                    "row {}: field '{}' value {} must be positive",
                    self.index, field, v
                ));
            }
        }
    }

    fn non_negative(&mut self, field: &str, value: Option<i64>) {
        if let Some(v) = value {
            if v < 0 {
                self.errors.push(format!(
                    "row {}: field '{}' value {} must not be negative",
                    self.index, field, v
                ));
            }
        }
    }
}

/// Validate and serialize artist stream rows. Genre text that fails to
/// decode becomes an empty list, matching the dashboard behavior.
pub fn serialize_artist_streams(
    rows: Vec<ArtistStreamRow>,
) -> Result<Vec<ArtistStreamResponse>, Vec<String>> {
    let mut errors = Vec::new();
    let mut out = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let mut check = RowCheck {
            index,
            errors: &mut errors,
        };

        let artist_id = check.required("artist_id", row.artist_id);
        let artist_name = check.required("artist_name", row.artist_name);
        let track_name = check.required("track_name", row.track_name);
        let extraction_date = check.required("extraction_date", row.extraction_date);
        let processed_at = check.required("processed_at", row.processed_at);
        let is_kpop = check.required("is_kpop", row.is_kpop);
        let is_jpop = check.required("is_jpop", row.is_jpop);
        check.in_range("popularity", row.popularity, 0, 100);
        check.non_negative("followers", row.followers);

        let genres: Vec<String> = row
            .genres
            .as_deref()
            .and_then(|g| serde_json::from_str(g).ok())
            .unwrap_or_default();

        if let (
            Some(artist_id),
            Some(artist_name),
            Some(track_name),
            Some(extraction_date),
            Some(processed_at),
            Some(is_kpop),
            Some(is_jpop),
        ) = (
            artist_id,
            artist_name,
            track_name,
            extraction_date,
            processed_at,
            is_kpop,
            is_jpop,
        ) {
            out.push(ArtistStreamResponse {
                artist_id,
                artist_name,
                track_name,
                popularity: row.popularity,
                album: row.album,
                followers: row.followers,
                genres,
                extraction_date,
                popularity_category: row.popularity_category,
                is_kpop,
                is_jpop,
                processed_at,
            });
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

/// Validate and serialize playlist rows
pub fn serialize_playlists(rows: Vec<PlaylistRow>) -> Result<Vec<PlaylistResponse>, Vec<String>> {
    let mut errors = Vec::new();
    let mut out = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let mut check = RowCheck {
            index,
            errors: &mut errors,
        };

        let playlist_id = check.required("playlist_id", row.playlist_id);
        let playlist_name = check.required("playlist_name", row.playlist_name);
        let owner_id = check.required("owner_id", row.owner_id);
        let followers = check.required("followers", row.followers);
        let total_tracks = check.required("total_tracks", row.total_tracks);
        let extraction_date = check.required("extraction_date", row.extraction_date);
        let processed_at = check.required("processed_at", row.processed_at);
        check.non_negative("followers", followers);

        if let (
            Some(playlist_id),
            Some(playlist_name),
            Some(owner_id),
            Some(followers),
            Some(total_tracks),
            Some(extraction_date),
            Some(processed_at),
        ) = (
            playlist_id,
            playlist_name,
            owner_id,
            followers,
            total_tracks,
            extraction_date,
            processed_at,
        ) {
            out.push(PlaylistResponse {
                playlist_id,
                playlist_name,
                owner_id,
                followers,
                total_tracks,
                extraction_date,
                processed_at,
            });
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

/// Validate and serialize playlist stream rows
pub fn serialize_playlist_streams(
    rows: Vec<PlaylistStreamRow>,
) -> Result<Vec<PlaylistStreamResponse>, Vec<String>> {
    let mut errors = Vec::new();
    let mut out = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let mut check = RowCheck {
            index,
            errors: &mut errors,
        };

        let playlist_id = check.required("playlist_id", row.playlist_id);
        let track_id = check.required("track_id", row.track_id);
        let track_name = check.required("track_name", row.track_name);
        let artist_name = check.required("artist_name", row.artist_name);
        let popularity = check.required("popularity", row.popularity);
        let duration_ms = check.required("duration_ms", row.duration_ms);
        let duration_min = check.required("duration_min", row.duration_min);
        let extraction_date = check.required("extraction_date", row.extraction_date);
        let processed_at = check.required("processed_at", row.processed_at);
        check.in_range("popularity", popularity, 0, 100);
        check.positive("duration_ms", duration_ms);

        if let (
            Some(playlist_id),
            Some(track_id),
            Some(track_name),
            Some(artist_name),
            Some(popularity),
            Some(duration_ms),
            Some(duration_min),
            Some(extraction_date),
            Some(processed_at),
        ) = (
            playlist_id,
            track_id,
            track_name,
            artist_name,
            popularity,
            duration_ms,
            duration_min,
            extraction_date,
            processed_at,
        ) {
            out.push(PlaylistStreamResponse {
                playlist_id,
                track_id,
                track_name,
                artist_name,
                popularity,
                album: row.album,
                duration_ms,
                extraction_date,
                duration_min,
                processed_at,
            });
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_artist_row() -> ArtistStreamRow {
        ArtistStreamRow {
            artist_id: Some("A1".to_string()),
            artist_name: Some("X".to_string()),
            track_name: Some("T1".to_string()),
            popularity: Some(95),
            album: Some("Album".to_string()),
            followers: Some(10),
            genres: Some(r#"["k-pop"]"#.to_string()),
            extraction_date: Some("2025-01-01".to_string()),
            popularity_category: Some("High".to_string()),
            is_kpop: Some(true),
            is_jpop: Some(false),
            processed_at: Some("2025-01-01 00:00:00".to_string()),
        }
    }

    #[test]
    fn test_valid_rows_pass_and_genres_decode() {
        let out = serialize_artist_streams(vec![valid_artist_row()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].genres, vec!["k-pop".to_string()]);
    }

    #[test]
    fn test_missing_required_field_is_client_error() {
        let mut row = valid_artist_row();
        row.artist_name = None;

        let errors = serialize_artist_streams(vec![row]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("artist_name"));
    }

    #[test]
    fn test_out_of_range_popularity_is_client_error() {
        let mut row = valid_artist_row();
        row.popularity = Some(150);

        let errors = serialize_artist_streams(vec![row]).unwrap_err();
        assert!(errors[0].contains("popularity"));
        assert!(errors[0].contains("150"));
    }

    fn valid_playlist_stream_row() -> PlaylistStreamRow {
        PlaylistStreamRow {
            playlist_id: Some("p1".to_string()),
            track_id: Some("t1".to_string()),
            track_name: Some("Song".to_string()),
            artist_name: Some("X".to_string()),
            popularity: Some(55),
            album: None,
            duration_ms: Some(215000),
            extraction_date: Some("2025-01-01".to_string()),
            duration_min: Some(3.58),
            processed_at: Some("2025-01-01 00:00:00".to_string()),
        }
    }

    #[test]
    fn test_negative_followers_is_client_error() {
        let mut row = valid_artist_row();
        row.followers = Some(-1);

        let errors = serialize_artist_streams(vec![row]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("followers"));
    }

    #[test]
    fn test_zero_duration_is_client_error() {
        let mut row = valid_playlist_stream_row();
        row.duration_ms = Some(0);

        let errors = serialize_playlist_streams(vec![row]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duration_ms"));
    }

    #[test]
    fn test_valid_playlist_stream_row_passes() {
        let out = serialize_playlist_streams(vec![valid_playlist_stream_row()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].duration_min, 3.58);
    }

    #[test]
    fn test_undecodable_genres_default_to_empty_list() {
        let mut row = valid_artist_row();
        row.genres = Some("not json".to_string());

        let out = serialize_artist_streams(vec![row]).unwrap();
        assert!(out[0].genres.is_empty());
    }
}
