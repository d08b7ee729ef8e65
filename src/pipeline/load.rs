//! Load stage: bulk-write cleaned datasets into the warehouse
//!
//! A missing cleaned artifact means "nothing new to load" and is skipped
//! with a warning. A failure loading one dataset is logged and the
//! remaining datasets are still attempted.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::LoadMode;
use crate::db::Warehouse;
use crate::models::{ArtistStreamRecord, PlaylistRecord, PlaylistStreamRecord};
use crate::pipeline::artifacts::{Artifact, ArtifactStore, DatasetKind, Stage};

pub struct Loader<'a> {
    warehouse: &'a Warehouse,
    mode: LoadMode,
}

impl<'a> Loader<'a> {
    pub fn new(warehouse: &'a Warehouse, mode: LoadMode) -> Self {
        Self { warehouse, mode }
    }

    /// Load all three cleaned datasets. Returns Ok even when individual
    /// datasets fail; only schema setup failure propagates.
    pub async fn run(&self, store: &ArtifactStore) -> Result<()> {
        self.warehouse.ensure_schema().await?;

        if let Err(e) = self
            .load_one(store.artifact(DatasetKind::ArtistStreams, Stage::Cleaned))
            .await
        {
            error!("Failed to load artist_streams: {}", e);
        }
        if let Err(e) = self
            .load_one(store.artifact(DatasetKind::Playlists, Stage::Cleaned))
            .await
        {
            error!("Failed to load playlists: {}", e);
        }
        if let Err(e) = self
            .load_one(store.artifact(DatasetKind::PlaylistStreams, Stage::Cleaned))
            .await
        {
            error!("Failed to load playlist_streams: {}", e);
        }

        Ok(())
    }

    async fn load_one(&self, artifact: Artifact) -> Result<()> {
        if !artifact.exists() {
            warn!(
                "{:?} not found. Skipping {} load.",
                artifact.path(),
                artifact.kind().name()
            );
            return Ok(());
        }

        let written = match artifact.kind() {
            DatasetKind::ArtistStreams => {
                let rows: Vec<ArtistStreamRecord> =
                    artifact.read_records()?.unwrap_or_default();
                self.warehouse.load_artist_streams(&rows, self.mode).await?
            }
            DatasetKind::Playlists => {
                let rows: Vec<PlaylistRecord> = artifact.read_records()?.unwrap_or_default();
                self.warehouse.load_playlists(&rows, self.mode).await?
            }
            DatasetKind::PlaylistStreams => {
                let rows: Vec<PlaylistStreamRecord> =
                    artifact.read_records()?.unwrap_or_default();
                self.warehouse.load_playlist_streams(&rows, self.mode).await?
            }
        };

        info!("Loaded {} rows into {}", written, artifact.kind().name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PopularityCategory;
    use crate::pipeline::transform::Transformer;
    use crate::models::RawArtistTrack;

    async fn warehouse() -> Warehouse {
        let warehouse = Warehouse::connect_in_memory().await.unwrap();
        warehouse.ensure_schema().await.unwrap();
        warehouse
    }

    #[tokio::test]
    async fn test_missing_artifact_is_skipped_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let warehouse = warehouse().await;

        // no cleaned artifacts exist at all
        Loader::new(&warehouse, LoadMode::Append)
            .run(&store)
            .await
            .unwrap();

        assert_eq!(warehouse.count(DatasetKind::Playlists).await.unwrap(), 0);
        assert_eq!(warehouse.count(DatasetKind::ArtistStreams).await.unwrap(), 0);
        warehouse.close().await;
    }

    #[tokio::test]
    async fn test_one_bad_artifact_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let warehouse = warehouse().await;

        // artist artifact is garbage, playlists artifact is fine
        std::fs::write(
            store
                .artifact(DatasetKind::ArtistStreams, Stage::Cleaned)
                .path(),
            "{ not json\n",
        )
        .unwrap();
        store
            .artifact(DatasetKind::Playlists, Stage::Cleaned)
            .write_records(&[crate::models::PlaylistRecord {
                playlist_id: "p1".to_string(),
                playlist_name: "Mix".to_string(),
                owner_id: "owner".to_string(),
                followers: 1,
                total_tracks: 2,
                extraction_date: "2025-01-01".to_string(),
                processed_at: "2025-01-01 00:00:00".to_string(),
            }])
            .unwrap();

        Loader::new(&warehouse, LoadMode::Append)
            .run(&store)
            .await
            .unwrap();

        assert_eq!(warehouse.count(DatasetKind::ArtistStreams).await.unwrap(), 0);
        assert_eq!(warehouse.count(DatasetKind::Playlists).await.unwrap(), 1);
        warehouse.close().await;
    }

    #[tokio::test]
    async fn test_transform_then_load_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let warehouse = warehouse().await;

        store
            .artifact(DatasetKind::ArtistStreams, Stage::Raw)
            .write_records(&[RawArtistTrack {
                artist_id: "A1".to_string(),
                artist_name: Some("X".to_string()),
                track_name: Some("T1".to_string()),
                popularity: Some(95),
                album: Some("Album".to_string()),
                followers: Some(10),
                genres: Some(r#"["k-pop"]"#.to_string()),
                extraction_date: "2025-01-01".to_string(),
            }])
            .unwrap();

        Transformer::with_timestamp("2025-01-01 12:00:00")
            .run(&store)
            .unwrap();
        Loader::new(&warehouse, LoadMode::Append)
            .run(&store)
            .await
            .unwrap();

        let rows = warehouse.latest_artist_streams(50).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].popularity_category.as_deref(),
            Some(PopularityCategory::High.as_str())
        );
        assert_eq!(rows[0].is_kpop, Some(true));
        assert_eq!(rows[0].is_jpop, Some(false));

        let genres: Vec<String> =
            serde_json::from_str(rows[0].genres.as_deref().unwrap()).unwrap();
        assert!(genres.contains(&"k-pop".to_string()));
        warehouse.close().await;
    }
}
