//! Spotify Web API access for track search and lookup.
//!
//! Tokens come from the client-credentials flow and live in a [`TokenCache`]
//! handed to the client by the caller, so several clients (or tests) never
//! share hidden process-wide state.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::dto::{spotify::TrackSummary, validation::validate_track_id};

/// Default base URL of the Spotify accounts service.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
/// Default base URL of the Spotify Web API.
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
/// Tokens are renewed this long before Spotify would reject them.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Failures raised while talking to Spotify.
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("spotify credentials are not configured")]
    NotConfigured,
    #[error("failed to build spotify http client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    #[error("spotify request to `{url}` failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("spotify answered {status} for `{url}`")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode spotify response for `{url}`")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{0}` is not a spotify track id")]
    InvalidTrackId(String),
    #[error("track `{0}` not found")]
    TrackNotFound(String),
}

/// Client credentials and endpoints used by [`SpotifyClient`].
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub accounts_url: String,
    pub api_url: String,
}

impl SpotifyConfig {
    /// Credentials pointing at the public Spotify endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_owned(),
            api_url: DEFAULT_API_URL.to_owned(),
        }
    }

    /// Read `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET`; `None` when either is missing.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("SPOTIFY_CLIENT_ID").ok()?;
        let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").ok()?;
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return None;
        }
        Some(Self::new(client_id, client_secret))
    }
}

/// An access token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: Instant,
}

/// Holds at most one access token. The clock is always passed in.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token unless it expires within the refresh margin.
    pub async fn get(&self, now: Instant) -> Option<String> {
        let guard = self.slot.lock().await;
        guard
            .as_ref()
            .filter(|token| now + REFRESH_MARGIN < token.expires_at)
            .map(|token| token.value.clone())
    }

    /// Remember a freshly issued token valid for `expires_in` from `now`.
    pub async fn store(&self, value: String, expires_in: Duration, now: Instant) {
        let mut guard = self.slot.lock().await;
        *guard = Some(CachedToken {
            value,
            expires_at: now + expires_in,
        });
    }

    /// Serialise token refreshes; holders re-check [`TokenCache::get`] before fetching.
    pub async fn refresh_guard(&self) -> MutexGuard<'_, ()> {
        self.refresh.lock().await
    }

    /// Forget the cached token, e.g. after Spotify rejected it.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    pub album: Option<ApiAlbum>,
    pub duration_ms: u64,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ApiExternalUrls,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiImage {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiExternalUrls {
    pub spotify: Option<String>,
}

/// Thin Spotify Web API client sharing an injected [`TokenCache`].
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    config: Arc<SpotifyConfig>,
    tokens: Arc<TokenCache>,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig, tokens: Arc<TokenCache>) -> Result<Self, SpotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| SpotifyError::ClientBuilder { source })?;

        Ok(Self {
            http,
            config: Arc::new(config),
            tokens,
        })
    }

    /// Search tracks matching `query`, returning at most `limit` results.
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: u8,
    ) -> Result<Vec<TrackSummary>, SpotifyError> {
        let params = [
            ("q", query.to_owned()),
            ("type", "track".to_owned()),
            ("limit", limit.to_string()),
        ];
        let response = self
            .get_json::<SearchResponse>("/search", &params)
            .await?
            .ok_or_else(|| SpotifyError::Status {
                url: format!("{}/search", self.config.api_url),
                status: StatusCode::NOT_FOUND,
            })?;

        Ok(response.tracks.items.into_iter().map(Into::into).collect())
    }

    /// Fetch one track by its Spotify identifier.
    ///
    /// Anything but a 22 character base-62 id is refused before a request is sent.
    pub async fn get_track(&self, track_id: &str) -> Result<TrackSummary, SpotifyError> {
        if validate_track_id(track_id).is_err() {
            return Err(SpotifyError::InvalidTrackId(track_id.to_owned()));
        }

        let path = format!("/tracks/{track_id}");
        self.get_json::<ApiTrack>(&path, &[])
            .await?
            .map(Into::into)
            .ok_or_else(|| SpotifyError::TrackNotFound(track_id.to_owned()))
    }

    async fn access_token(&self) -> Result<String, SpotifyError> {
        if let Some(token) = self.tokens.get(Instant::now()).await {
            return Ok(token);
        }

        let _refresh = self.tokens.refresh_guard().await;
        let now = Instant::now();
        if let Some(token) = self.tokens.get(now).await {
            return Ok(token);
        }

        debug!("requesting a new spotify access token");
        let url = format!("{}/api/token", self.config.accounts_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|source| SpotifyError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SpotifyError::Status {
                url,
                status: response.status(),
            });
        }

        let payload = response
            .json::<TokenResponse>()
            .await
            .map_err(|source| SpotifyError::Decode {
                url: url.clone(),
                source,
            })?;

        self.tokens
            .store(
                payload.access_token.clone(),
                Duration::from_secs(payload.expires_in),
                now,
            )
            .await;
        Ok(payload.access_token)
    }

    /// GET an API path; `Ok(None)` on 404. A rejected token is dropped and the
    /// request retried once with a fresh one.
    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>, SpotifyError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.api_url, path);
        let mut retried = false;

        loop {
            let token = self.access_token().await?;
            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await
                .map_err(|source| SpotifyError::Request {
                    url: url.clone(),
                    source,
                })?;

            match response.status() {
                StatusCode::UNAUTHORIZED if !retried => {
                    warn!(path, "spotify rejected the cached token; refreshing");
                    self.tokens.invalidate().await;
                    retried = true;
                }
                StatusCode::NOT_FOUND => return Ok(None),
                status if status.is_success() => {
                    return response.json::<T>().await.map(Some).map_err(|source| {
                        SpotifyError::Decode {
                            url: url.clone(),
                            source,
                        }
                    });
                }
                status => {
                    return Err(SpotifyError::Status {
                        url: url.clone(),
                        status,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{StatusCode as HttpStatus, Uri},
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    const TRACK: &str = "4uLU6hMCjMI75M1A2tKUQC";

    #[derive(Clone, Default)]
    struct MockSpotify {
        token_requests: Arc<AtomicUsize>,
        api_paths: Arc<std::sync::Mutex<Vec<String>>>,
    }

    async fn issue_token(State(mock): State<MockSpotify>) -> Json<Value> {
        mock.token_requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Json(json!({"access_token": "mock-token", "token_type": "Bearer", "expires_in": 3600}))
    }

    async fn lookup_track(State(mock): State<MockSpotify>, uri: Uri, Path(id): Path<String>) -> Json<Value> {
        mock.api_paths.lock().unwrap().push(uri.path().to_owned());
        Json(json!({"id": id, "name": "Mock", "artists": [], "album": null, "duration_ms": 1000}))
    }

    async fn unexpected(State(mock): State<MockSpotify>, uri: Uri) -> HttpStatus {
        mock.api_paths.lock().unwrap().push(uri.to_string());
        HttpStatus::NOT_FOUND
    }

    async fn mock_client() -> (SpotifyClient, MockSpotify) {
        let mock = MockSpotify::default();
        let app = Router::new()
            .route("/api/token", post(issue_token))
            .route("/v1/tracks/{id}", get(lookup_track))
            .fallback(unexpected)
            .with_state(mock.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = SpotifyConfig {
            accounts_url: format!("http://{addr}"),
            api_url: format!("http://{addr}/v1"),
            ..SpotifyConfig::new("client", "secret")
        };
        let client = SpotifyClient::new(config, Arc::new(TokenCache::new())).unwrap();
        (client, mock)
    }

    #[tokio::test]
    async fn malformed_track_id_never_reaches_spotify() {
        let (client, mock) = mock_client().await;

        for id in ["../me/playlists?limit=50", "..%2Fme", "4uLU6hMCjMI75M1A2tKU-C", ""] {
            let result = client.get_track(id).await;
            assert!(matches!(result, Err(SpotifyError::InvalidTrackId(_))));
        }

        assert_eq!(mock.token_requests.load(Ordering::SeqCst), 0);
        assert!(mock.api_paths.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_token_request() {
        let (client, mock) = mock_client().await;

        let lookups = (0..8).map(|_| client.get_track(TRACK));
        for result in futures::future::join_all(lookups).await {
            assert_eq!(result.unwrap().id, TRACK);
        }

        assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
        let paths = mock.api_paths.lock().unwrap();
        assert_eq!(paths.len(), 8);
        assert!(paths.iter().all(|path| path == &format!("/v1/tracks/{TRACK}")));
    }

    #[tokio::test]
    async fn empty_cache_has_no_token() {
        let cache = TokenCache::new();
        assert_eq!(cache.get(Instant::now()).await, None);
    }

    #[tokio::test]
    async fn token_is_reused_until_refresh_margin() {
        let cache = TokenCache::new();
        let issued = Instant::now();
        cache
            .store("abc".into(), Duration::from_secs(3600), issued)
            .await;

        assert_eq!(cache.get(issued).await.as_deref(), Some("abc"));
        assert_eq!(
            cache.get(issued + Duration::from_secs(3500)).await.as_deref(),
            Some("abc")
        );
        assert_eq!(cache.get(issued + Duration::from_secs(3541)).await, None);
    }

    #[tokio::test]
    async fn short_lived_token_is_never_served() {
        let cache = TokenCache::new();
        let issued = Instant::now();
        cache.store("brief".into(), Duration::from_secs(30), issued).await;
        assert_eq!(cache.get(issued).await, None);
    }

    #[tokio::test]
    async fn invalidate_clears_the_slot() {
        let cache = TokenCache::new();
        let issued = Instant::now();
        cache
            .store("abc".into(), Duration::from_secs(3600), issued)
            .await;
        cache.invalidate().await;
        assert_eq!(cache.get(issued).await, None);
    }

    #[test]
    fn search_payload_maps_to_summaries() {
        let raw = r#"{
            "tracks": {"items": [{
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "artists": [{"name": "Rick Astley"}],
                "album": {"name": "Whenever You Need Somebody", "images": [{"url": "https://i.scdn.co/image/x"}]},
                "duration_ms": 213573,
                "preview_url": null,
                "external_urls": {"spotify": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"}
            }]}
        }"#;

        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let summaries = parsed
            .tracks
            .items
            .into_iter()
            .map(TrackSummary::from)
            .collect::<Vec<_>>();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].artists, vec!["Rick Astley".to_string()]);
        assert_eq!(
            summaries[0].image_url.as_deref(),
            Some("https://i.scdn.co/image/x")
        );
        assert_eq!(summaries[0].preview_url, None);
    }
}
