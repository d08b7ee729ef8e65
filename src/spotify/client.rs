//! Spotify Web API client (client-credentials flow)

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::CatalogSource;

const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Margin subtracted from the token lifetime so we refresh before expiry
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Failure taxonomy for catalog fetches. The extractor treats all of
/// these as per-item failures except at construction time, where a
/// credential problem is fatal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("entity not found: {0}")]
    NotFound(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Artist metadata response
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistInfo {
    pub name: String,
    #[serde(default)]
    pub followers: FollowerCount,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowerCount {
    #[serde(default)]
    pub total: i64,
}

/// One of the artist's top tracks
#[derive(Debug, Clone, Deserialize)]
pub struct TopTrack {
    pub name: String,
    #[serde(default)]
    pub popularity: i64,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

/// Playlist metadata response
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistInfo {
    pub name: String,
    pub owner: OwnerRef,
    /// Absent for some playlists; the extractor defaults the count to 0
    #[serde(default)]
    pub followers: Option<FollowerCount>,
    pub tracks: TrackTotals,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackTotals {
    #[serde(default)]
    pub total: i64,
}

/// One page of playlist tracks with the cursor to the next page
#[derive(Debug, Clone, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<PageItem>,
    /// Opaque URL of the next page; None when the collection is exhausted
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageItem {
    /// Null when the track was removed from the catalog
    #[serde(default)]
    pub track: Option<PlaylistTrackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrackItem {
    /// Null for local files; such entries are skipped
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub popularity: i64,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub duration_ms: i64,
}

/// Spotify Web API client with a cached client-credentials token
pub struct SpotifyClient {
    http: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Build a client from API credentials. Fails when either credential
    /// is missing; this is the only fatal setup error in the pipeline.
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, SourceError> {
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(SourceError::Auth(
                "client_id and client_secret must be configured".to_string(),
            ));
        }

        Ok(Self {
            http: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Get a valid access token, refreshing the cached one if expired
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.access_token.clone());
            }
        }

        debug!("Requesting new Spotify access token");
        let resp = self
            .http
            .post(ACCOUNTS_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("token request failed ({status}): {body}")));
        }

        let token: TokenResponse = resp.json().await?;
        let expires_at =
            Utc::now() + Duration::seconds(token.expires_in - TOKEN_EXPIRY_MARGIN_SECS);
        let access_token = token.access_token.clone();

        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    /// GET a catalog URL and deserialize the JSON response
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let token = self.access_token().await?;

        let resp = self.http.get(url).bearer_auth(&token).send().await?;

        match resp.status() {
            status if status.is_success() => Ok(resp.json().await?),
            StatusCode::UNAUTHORIZED => {
                Err(SourceError::Auth("access token rejected".to_string()))
            }
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(url.to_string())),
            status => {
                let message = resp.text().await.unwrap_or_default();
                Err(SourceError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl CatalogSource for SpotifyClient {
    async fn artist(&self, artist_id: &str) -> Result<ArtistInfo, SourceError> {
        self.get_json(&format!("{API_BASE_URL}/artists/{artist_id}"))
            .await
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<TopTrack>, SourceError> {
        #[derive(Deserialize)]
        struct TopTracksResponse {
            #[serde(default)]
            tracks: Vec<TopTrack>,
        }

        let resp: TopTracksResponse = self
            .get_json(&format!("{API_BASE_URL}/artists/{artist_id}/top-tracks?market=US"))
            .await?;
        Ok(resp.tracks)
    }

    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistInfo, SourceError> {
        self.get_json(&format!("{API_BASE_URL}/playlists/{playlist_id}"))
            .await
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<TrackPage, SourceError> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => format!("{API_BASE_URL}/playlists/{playlist_id}/tracks"),
        };
        self.get_json(&url).await
    }
}
