//! Record types for the three pipeline datasets
//!
//! Each dataset has a raw shape (what the extractor emits) and a cleaned
//! shape (what the transformer derives). Raw numeric fields are lenient:
//! a value that cannot be coerced to an integer becomes `None` so the
//! failed coercion stays visible downstream.

mod artist_stream;
mod playlist;
mod playlist_track;

pub use artist_stream::{ArtistStreamRecord, PopularityCategory, RawArtistTrack};
pub use playlist::{PlaylistRecord, RawPlaylist};
pub use playlist_track::{duration_min, PlaylistStreamRecord, RawPlaylistTrack};

/// Lenient integer deserialization: accepts a number, a numeric string,
/// or null. Anything else deserializes to `None` instead of failing.
pub(crate) mod lenient_int {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }
}

/// Case-insensitive membership test for a genre tag
pub fn has_genre(genres: &[String], tag: &str) -> bool {
    genres.iter().any(|g| g.to_lowercase() == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "lenient_int::deserialize")]
        value: Option<i64>,
    }

    fn parse(json: &str) -> Option<i64> {
        serde_json::from_str::<Holder>(json).unwrap().value
    }

    #[test]
    fn test_lenient_int_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse(r#"{"value": 42}"#), Some(42));
        assert_eq!(parse(r#"{"value": "42"}"#), Some(42));
        assert_eq!(parse(r#"{"value": " 7 "}"#), Some(7));
    }

    #[test]
    fn test_lenient_int_failed_coercion_is_none() {
        assert_eq!(parse(r#"{"value": "n/a"}"#), None);
        assert_eq!(parse(r#"{"value": null}"#), None);
        assert_eq!(parse(r#"{"value": [1]}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[test]
    fn test_has_genre_is_case_insensitive() {
        let genres = vec!["K-Pop".to_string(), "dance".to_string()];
        assert!(has_genre(&genres, "k-pop"));
        assert!(!has_genre(&genres, "j-pop"));
        assert!(!has_genre(&[], "k-pop"));
    }
}
