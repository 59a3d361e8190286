use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Whether Spotify credentials were configured at startup.
    pub spotify: bool,
}

impl HealthResponse {
    /// Create a health response indicating the lobby store is reachable.
    pub fn ok(spotify: bool) -> Self {
        Self {
            status: "ok".to_string(),
            spotify,
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(spotify: bool) -> Self {
        Self {
            status: "degraded".to_string(),
            spotify,
        }
    }
}
