//! Artist stream records: one row per (artist, top track) pair

use serde::{Deserialize, Serialize};

use super::lenient_int;

/// Raw row emitted by the extractor. Artist fields (name, followers,
/// genres) are denormalized onto every track row; genres travel as a
/// JSON-encoded list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArtistTrack {
    pub artist_id: String,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int::deserialize")]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, deserialize_with = "lenient_int::deserialize")]
    pub followers: Option<i64>,
    /// JSON-encoded list of genre strings
    #[serde(default)]
    pub genres: Option<String>,
    pub extraction_date: String,
}

/// Cleaned row as loaded into the artist_streams table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistStreamRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub track_name: String,
    /// None when the raw value could not be coerced to an integer
    pub popularity: Option<i64>,
    pub album: Option<String>,
    pub followers: Option<i64>,
    pub genres: Vec<String>,
    pub extraction_date: String,
    pub popularity_category: Option<PopularityCategory>,
    pub is_kpop: bool,
    pub is_jpop: bool,
    pub processed_at: String,
}

/// Popularity bucket: Low iff popularity <= 30, Medium iff 30 < p <= 60,
/// High iff p > 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopularityCategory {
    Low,
    Medium,
    High,
}

impl PopularityCategory {
    pub fn from_popularity(popularity: i64) -> Self {
        if popularity <= 30 {
            PopularityCategory::Low
        } else if popularity <= 60 {
            PopularityCategory::Medium
        } else {
            PopularityCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PopularityCategory::Low => "Low",
            PopularityCategory::Medium => "Medium",
            PopularityCategory::High => "High",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popularity_category_cut_points() {
        assert_eq!(PopularityCategory::from_popularity(0), PopularityCategory::Low);
        assert_eq!(PopularityCategory::from_popularity(30), PopularityCategory::Low);
        assert_eq!(PopularityCategory::from_popularity(31), PopularityCategory::Medium);
        assert_eq!(PopularityCategory::from_popularity(60), PopularityCategory::Medium);
        assert_eq!(PopularityCategory::from_popularity(61), PopularityCategory::High);
        assert_eq!(PopularityCategory::from_popularity(100), PopularityCategory::High);
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&PopularityCategory::Medium).unwrap();
        assert_eq!(json, "\"Medium\"");
    }

    #[test]
    fn test_raw_row_tolerates_bad_numerics() {
        let raw: RawArtistTrack = serde_json::from_str(
            r#"{"artist_id":"A1","artist_name":"X","track_name":"T",
                "popularity":"not-a-number","followers":10,
                "genres":"[\"k-pop\"]","extraction_date":"2025-01-01"}"#,
        )
        .unwrap();
        assert_eq!(raw.popularity, None);
        assert_eq!(raw.followers, Some(10));
    }
}
