//! Warehouse connection and table operations
//!
//! One `Warehouse` is opened per stage invocation and closed on all exit
//! paths; there is no shared global pool. Column names are uppercased at
//! the write boundary per the warehouse contract.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;

use crate::config::LoadMode;
use crate::models::{ArtistStreamRecord, PlaylistRecord, PlaylistStreamRecord};
use crate::pipeline::artifacts::DatasetKind;

/// Row read back from artist_streams. All fields are nullable so a
/// malformed row surfaces as a validation error, not a decode failure.
#[derive(Debug, Clone, FromRow)]
pub struct ArtistStreamRow {
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub track_name: Option<String>,
    pub popularity: Option<i64>,
    pub album: Option<String>,
    pub followers: Option<i64>,
    /// JSON-encoded genre list as stored in the warehouse
    pub genres: Option<String>,
    pub extraction_date: Option<String>,
    pub popularity_category: Option<String>,
    pub is_kpop: Option<bool>,
    pub is_jpop: Option<bool>,
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlaylistRow {
    pub playlist_id: Option<String>,
    pub playlist_name: Option<String>,
    pub owner_id: Option<String>,
    pub followers: Option<i64>,
    pub total_tracks: Option<i64>,
    pub extraction_date: Option<String>,
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlaylistStreamRow {
    pub playlist_id: Option<String>,
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub popularity: Option<i64>,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    pub extraction_date: Option<String>,
    pub duration_min: Option<f64>,
    pub processed_at: Option<String>,
}

/// SQLite-backed warehouse
pub struct Warehouse {
    pool: SqlitePool,
}

impl Warehouse {
    /// Open (creating if missing) the warehouse database file
    pub async fn connect(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to warehouse")?;

        Ok(Self { pool })
    }

    /// In-memory warehouse, used by tests
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // a single persistent connection keeps the in-memory db alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory warehouse")?;
        Ok(Self { pool })
    }

    /// Create the three target tables if absent. Existing tables are
    /// left untouched.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artist_streams (
                ARTIST_ID TEXT,
                ARTIST_NAME TEXT,
                TRACK_NAME TEXT,
                POPULARITY INTEGER,
                ALBUM TEXT,
                FOLLOWERS INTEGER,
                GENRES TEXT,
                EXTRACTION_DATE TEXT,
                POPULARITY_CATEGORY TEXT,
                IS_KPOP BOOLEAN,
                IS_JPOP BOOLEAN,
                PROCESSED_AT TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playlists (
                PLAYLIST_ID TEXT,
                PLAYLIST_NAME TEXT,
                OWNER_ID TEXT,
                FOLLOWERS INTEGER,
                TOTAL_TRACKS INTEGER,
                EXTRACTION_DATE TEXT,
                PROCESSED_AT TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playlist_streams (
                PLAYLIST_ID TEXT,
                TRACK_ID TEXT,
                TRACK_NAME TEXT,
                ARTIST_NAME TEXT,
                POPULARITY INTEGER,
                ALBUM TEXT,
                DURATION_MS INTEGER,
                EXTRACTION_DATE TEXT,
                DURATION_MIN REAL,
                PROCESSED_AT TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Bulk-write artist stream rows. Replace mode deletes prior rows in
    /// the same transaction; append mode accumulates.
    pub async fn load_artist_streams(
        &self,
        rows: &[ArtistStreamRecord],
        mode: LoadMode,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        if mode == LoadMode::Replace {
            sqlx::query("DELETE FROM artist_streams")
                .execute(&mut *tx)
                .await?;
        }

        let mut written = 0u64;
        for row in rows {
            // re-encode the genre list for the structured column
            let genres = serde_json::to_string(&row.genres)?;
            sqlx::query(
                "INSERT INTO artist_streams (ARTIST_ID, ARTIST_NAME, TRACK_NAME, POPULARITY, \
                 ALBUM, FOLLOWERS, GENRES, EXTRACTION_DATE, POPULARITY_CATEGORY, IS_KPOP, \
                 IS_JPOP, PROCESSED_AT) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.artist_id)
            .bind(&row.artist_name)
            .bind(&row.track_name)
            .bind(row.popularity)
            .bind(&row.album)
            .bind(row.followers)
            .bind(&genres)
            .bind(&row.extraction_date)
            .bind(row.popularity_category.map(|c| c.as_str()))
            .bind(row.is_kpop)
            .bind(row.is_jpop)
            .bind(&row.processed_at)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Bulk-write playlist rows
    pub async fn load_playlists(&self, rows: &[PlaylistRecord], mode: LoadMode) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        if mode == LoadMode::Replace {
            sqlx::query("DELETE FROM playlists").execute(&mut *tx).await?;
        }

        let mut written = 0u64;
        for row in rows {
            sqlx::query(
                "INSERT INTO playlists (PLAYLIST_ID, PLAYLIST_NAME, OWNER_ID, FOLLOWERS, \
                 TOTAL_TRACKS, EXTRACTION_DATE, PROCESSED_AT) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.playlist_id)
            .bind(&row.playlist_name)
            .bind(&row.owner_id)
            .bind(row.followers)
            .bind(row.total_tracks)
            .bind(&row.extraction_date)
            .bind(&row.processed_at)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Bulk-write playlist stream rows
    pub async fn load_playlist_streams(
        &self,
        rows: &[PlaylistStreamRecord],
        mode: LoadMode,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        if mode == LoadMode::Replace {
            sqlx::query("DELETE FROM playlist_streams")
                .execute(&mut *tx)
                .await?;
        }

        let mut written = 0u64;
        for row in rows {
            sqlx::query(
                "INSERT INTO playlist_streams (PLAYLIST_ID, TRACK_ID, TRACK_NAME, ARTIST_NAME, \
                 POPULARITY, ALBUM, DURATION_MS, EXTRACTION_DATE, DURATION_MIN, PROCESSED_AT) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.playlist_id)
            .bind(&row.track_id)
            .bind(&row.track_name)
            .bind(&row.artist_name)
            .bind(row.popularity)
            .bind(&row.album)
            .bind(row.duration_ms)
            .bind(&row.extraction_date)
            .bind(row.duration_min)
            .bind(&row.processed_at)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Most recently processed artist stream rows
    pub async fn latest_artist_streams(&self, limit: i64) -> Result<Vec<ArtistStreamRow>> {
        let rows = sqlx::query_as(
            "SELECT ARTIST_ID as artist_id, ARTIST_NAME as artist_name, \
             TRACK_NAME as track_name, POPULARITY as popularity, ALBUM as album, \
             FOLLOWERS as followers, GENRES as genres, EXTRACTION_DATE as extraction_date, \
             POPULARITY_CATEGORY as popularity_category, IS_KPOP as is_kpop, \
             IS_JPOP as is_jpop, PROCESSED_AT as processed_at \
             FROM artist_streams ORDER BY PROCESSED_AT DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Most recently processed playlist rows
    pub async fn latest_playlists(&self, limit: i64) -> Result<Vec<PlaylistRow>> {
        let rows = sqlx::query_as(
            "SELECT PLAYLIST_ID as playlist_id, PLAYLIST_NAME as playlist_name, \
             OWNER_ID as owner_id, FOLLOWERS as followers, TOTAL_TRACKS as total_tracks, \
             EXTRACTION_DATE as extraction_date, PROCESSED_AT as processed_at \
             FROM playlists ORDER BY PROCESSED_AT DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Most recently processed playlist stream rows
    pub async fn latest_playlist_streams(&self, limit: i64) -> Result<Vec<PlaylistStreamRow>> {
        let rows = sqlx::query_as(
            "SELECT PLAYLIST_ID as playlist_id, TRACK_ID as track_id, \
             TRACK_NAME as track_name, ARTIST_NAME as artist_name, POPULARITY as popularity, \
             ALBUM as album, DURATION_MS as duration_ms, EXTRACTION_DATE as extraction_date, \
             DURATION_MIN as duration_min, PROCESSED_AT as processed_at \
             FROM playlist_streams ORDER BY PROCESSED_AT DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Row count for one dataset's table
    pub async fn count(&self, kind: DatasetKind) -> Result<i64> {
        let sql = match kind {
            DatasetKind::ArtistStreams => "SELECT COUNT(*) FROM artist_streams",
            DatasetKind::Playlists => "SELECT COUNT(*) FROM playlists",
            DatasetKind::PlaylistStreams => "SELECT COUNT(*) FROM playlist_streams",
        };
        let row: (i64,) = sqlx::query_as(sql).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    /// Close the pool. Called on every exit path of a stage.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PopularityCategory;

    fn artist_record(artist_id: &str, processed_at: &str) -> ArtistStreamRecord {
        ArtistStreamRecord {
            artist_id: artist_id.to_string(),
            artist_name: "Artist".to_string(),
            track_name: "Track".to_string(),
            popularity: Some(95),
            album: Some("Album".to_string()),
            followers: Some(10),
            genres: vec!["k-pop".to_string()],
            extraction_date: "2025-01-01".to_string(),
            popularity_category: Some(PopularityCategory::High),
            is_kpop: true,
            is_jpop: false,
            processed_at: processed_at.to_string(),
        }
    }

    async fn warehouse() -> Warehouse {
        let warehouse = Warehouse::connect_in_memory().await.unwrap();
        warehouse.ensure_schema().await.unwrap();
        warehouse
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let warehouse = warehouse().await;
        warehouse.ensure_schema().await.unwrap();
        for kind in DatasetKind::all() {
            assert_eq!(warehouse.count(kind).await.unwrap(), 0);
        }
        warehouse.close().await;
    }

    #[tokio::test]
    async fn test_append_mode_accumulates_rows() {
        let warehouse = warehouse().await;
        let rows = vec![artist_record("A1", "2025-01-01 00:00:00")];

        warehouse.load_artist_streams(&rows, LoadMode::Append).await.unwrap();
        warehouse.load_artist_streams(&rows, LoadMode::Append).await.unwrap();

        assert_eq!(warehouse.count(DatasetKind::ArtistStreams).await.unwrap(), 2);
        warehouse.close().await;
    }

    #[tokio::test]
    async fn test_replace_mode_keeps_one_generation() {
        let warehouse = warehouse().await;
        let rows = vec![
            artist_record("A1", "2025-01-01 00:00:00"),
            artist_record("A2", "2025-01-01 00:00:00"),
        ];

        warehouse.load_artist_streams(&rows, LoadMode::Replace).await.unwrap();
        warehouse.load_artist_streams(&rows, LoadMode::Replace).await.unwrap();

        assert_eq!(warehouse.count(DatasetKind::ArtistStreams).await.unwrap(), 2);
        warehouse.close().await;
    }

    #[tokio::test]
    async fn test_latest_rows_ordered_by_processed_at() {
        let warehouse = warehouse().await;
        warehouse
            .load_artist_streams(
                &[
                    artist_record("old", "2025-01-01 00:00:00"),
                    artist_record("new", "2025-01-02 00:00:00"),
                ],
                LoadMode::Append,
            )
            .await
            .unwrap();

        let latest = warehouse.latest_artist_streams(50).await.unwrap();
        assert_eq!(latest[0].artist_id.as_deref(), Some("new"));
        assert_eq!(latest[1].artist_id.as_deref(), Some("old"));
        warehouse.close().await;
    }

    #[tokio::test]
    async fn test_genres_stored_as_json_array_text() {
        let warehouse = warehouse().await;
        warehouse
            .load_artist_streams(&[artist_record("A1", "2025-01-01 00:00:00")], LoadMode::Append)
            .await
            .unwrap();

        let latest = warehouse.latest_artist_streams(1).await.unwrap();
        let genres: Vec<String> =
            serde_json::from_str(latest[0].genres.as_deref().unwrap()).unwrap();
        assert_eq!(genres, vec!["k-pop".to_string()]);
        warehouse.close().await;
    }
}
