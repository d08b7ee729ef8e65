//! Intermediate dataset artifacts
//!
//! Each stage reads and writes one JSON-lines file per dataset (one record
//! object per line, field names matching the warehouse column contract).
//! Stages exchange [`Artifact`] handles instead of relying on a shared
//! filename convention, so a stage only sees the artifacts it is handed.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The three datasets moving through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    ArtistStreams,
    Playlists,
    PlaylistStreams,
}

impl DatasetKind {
    pub fn all() -> [DatasetKind; 3] {
        [
            DatasetKind::ArtistStreams,
            DatasetKind::Playlists,
            DatasetKind::PlaylistStreams,
        ]
    }

    /// Dataset name, also the warehouse table name
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::ArtistStreams => "artist_streams",
            DatasetKind::Playlists => "playlists",
            DatasetKind::PlaylistStreams => "playlist_streams",
        }
    }
}

/// Pipeline stage that produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Raw,
    Cleaned,
}

/// Handle to one dataset artifact: kind plus location
#[derive(Debug, Clone)]
pub struct Artifact {
    kind: DatasetKind,
    stage: Stage,
    path: PathBuf,
}

impl Artifact {
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write all records, replacing any previous artifact. The file is
    /// written to a temp path and renamed so an interrupted run never
    /// leaves a partial artifact behind.
    pub fn write_records<T: Serialize>(&self, records: &[T]) -> Result<()> {
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = fs::File::create(&tmp_path)
                .with_context(|| format!("Failed to create {:?}", tmp_path))?;
            let mut writer = BufWriter::new(file);
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to move artifact into place at {:?}", self.path))?;
        Ok(())
    }

    /// Read all records as a typed dataset. Returns None when the
    /// artifact file is absent; an empty file is an empty dataset.
    pub fn read_records<T: DeserializeOwned>(&self) -> Result<Option<Vec<T>>> {
        match self.open_lines()? {
            None => Ok(None),
            Some(lines) => {
                let mut records = Vec::new();
                for line in lines {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: T = serde_json::from_str(&line)
                        .with_context(|| format!("Malformed record in {:?}", self.path))?;
                    records.push(record);
                }
                Ok(Some(records))
            }
        }
    }

    /// Read all records as untyped rows. Used by the validator, which
    /// needs to observe missing columns rather than fail on them.
    pub fn read_rows(&self) -> Result<Option<Vec<Map<String, Value>>>> {
        match self.open_lines()? {
            None => Ok(None),
            Some(lines) => {
                let mut rows = Vec::new();
                for line in lines {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let row: Map<String, Value> = serde_json::from_str(&line)
                        .with_context(|| format!("Malformed row in {:?}", self.path))?;
                    rows.push(row);
                }
                Ok(Some(rows))
            }
        }
    }

    fn open_lines(&self) -> Result<Option<std::io::Lines<BufReader<fs::File>>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&self.path)
            .with_context(|| format!("Failed to open artifact {:?}", self.path))?;
        Ok(Some(BufReader::new(file).lines()))
    }
}

/// Artifact directory for one pipeline deployment
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create data directory {:?}", base_dir))?;
        Ok(Self { base_dir })
    }

    /// Get the handle for one dataset at one stage
    pub fn artifact(&self, kind: DatasetKind, stage: Stage) -> Artifact {
        let file_name = match stage {
            Stage::Raw => format!("{}.jsonl", kind.name()),
            Stage::Cleaned => format!("cleaned_{}.jsonl", kind.name()),
        };
        Artifact {
            kind,
            stage,
            path: self.base_dir.join(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPlaylist;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn playlist(id: &str) -> RawPlaylist {
        RawPlaylist {
            playlist_id: id.to_string(),
            playlist_name: Some("Mix".to_string()),
            owner_id: Some("owner".to_string()),
            followers: Some(5),
            total_tracks: Some(10),
            extraction_date: "2025-01-01".to_string(),
        }
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (_dir, store) = store();
        let artifact = store.artifact(DatasetKind::Playlists, Stage::Raw);

        artifact
            .write_records(&[playlist("p1"), playlist("p2")])
            .unwrap();

        let back: Vec<RawPlaylist> = artifact.read_records().unwrap().unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].playlist_id, "p1");
        assert_eq!(back[1].playlist_id, "p2");
    }

    #[test]
    fn test_missing_artifact_is_none_not_error() {
        let (_dir, store) = store();
        let artifact = store.artifact(DatasetKind::Playlists, Stage::Cleaned);

        assert!(!artifact.exists());
        let result: Option<Vec<RawPlaylist>> = artifact.read_records().unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_dataset_is_empty_not_absent() {
        let (_dir, store) = store();
        let artifact = store.artifact(DatasetKind::ArtistStreams, Stage::Raw);

        artifact.write_records::<RawPlaylist>(&[]).unwrap();

        assert!(artifact.exists());
        let back: Vec<RawPlaylist> = artifact.read_records().unwrap().unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_rewrite_supersedes_previous_artifact() {
        let (_dir, store) = store();
        let artifact = store.artifact(DatasetKind::Playlists, Stage::Raw);

        artifact
            .write_records(&[playlist("p1"), playlist("p2")])
            .unwrap();
        artifact.write_records(&[playlist("p3")]).unwrap();

        let back: Vec<RawPlaylist> = artifact.read_records().unwrap().unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].playlist_id, "p3");
    }

    #[test]
    fn test_untyped_rows_expose_field_names() {
        let (_dir, store) = store();
        let artifact = store.artifact(DatasetKind::Playlists, Stage::Cleaned);
        artifact.write_records(&[playlist("p1")]).unwrap();

        let rows = artifact.read_rows().unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains_key("playlist_id"));
        assert!(rows[0].contains_key("total_tracks"));
    }
}
