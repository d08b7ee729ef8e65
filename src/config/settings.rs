//! Pipeline settings stored in settings.json
//!
//! Credentials and locations can be overridden through environment
//! variables so deployments can reconfigure between runs without
//! touching the settings file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the loader writes into the warehouse tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Accumulate rows across runs (the historical behavior)
    #[default]
    Append,
    /// Each run supersedes the previous generation of rows
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Spotify API client ID
    #[serde(default)]
    pub client_id: String,

    /// Spotify API client secret
    #[serde(default)]
    pub client_secret: String,

    /// Artist IDs to extract top tracks for
    #[serde(default)]
    pub artist_ids: Vec<String>,

    /// Playlist IDs to extract metadata and tracks for
    #[serde(default)]
    pub playlist_ids: Vec<String>,

    /// Directory holding intermediate dataset artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite warehouse database file
    #[serde(default = "default_warehouse_path")]
    pub warehouse_path: PathBuf,

    /// Pause after each artist fetch, in milliseconds
    #[serde(default = "default_artist_delay_ms")]
    pub artist_delay_ms: u64,

    /// Pause after each pagination page, in milliseconds
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Append or replace warehouse rows on load
    #[serde(default)]
    pub load_mode: LoadMode,

    /// When true, error-level validation findings make the pipeline
    /// runner skip the load step. Advisory-only by default.
    #[serde(default)]
    pub enforce_validation: bool,

    /// Read API bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Read API port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            artist_ids: Vec::new(),
            playlist_ids: Vec::new(),
            data_dir: default_data_dir(),
            warehouse_path: default_warehouse_path(),
            artist_delay_ms: default_artist_delay_ms(),
            page_delay_ms: default_page_delay_ms(),
            load_mode: LoadMode::default(),
            enforce_validation: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file (defaults when absent), then apply
    /// environment overrides. The env sync happens on every load so
    /// containerized deployments can change variables between restarts.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file {:?}", path))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse settings file {:?}", path))?
            }
            _ => Self::default(),
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("SPOTIFY_CLIENT_ID") {
            self.client_id = value;
        }
        if let Ok(value) = std::env::var("SPOTIFY_CLIENT_SECRET") {
            self.client_secret = value;
        }
        if let Ok(value) = std::env::var("PIPELINE_DATA_DIR") {
            self.data_dir = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("PIPELINE_WAREHOUSE") {
            self.warehouse_path = PathBuf::from(value);
        }
    }

    /// True when API credentials are configured. Only the extract stage
    /// needs them.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_warehouse_path() -> PathBuf {
    PathBuf::from("data/warehouse.db")
}

fn default_artist_delay_ms() -> u64 {
    500
}

fn default_page_delay_ms() -> u64 {
    100
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}
