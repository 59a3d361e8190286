use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::{
        spotify::{SearchQuery, TrackSummary},
        validation::validate_track_id,
    },
    error::{AppError, ServiceError},
    services::spotify::{SpotifyClient, SpotifyError},
    state::SharedState,
};

/// Proxy endpoints for the Spotify catalogue.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/spotify/search", get(search_tracks))
        .route("/spotify/tracks/{id}", get(get_track))
}

/// Search the Spotify catalogue for tracks.
#[utoipa::path(
    get,
    path = "/spotify/search",
    tag = "spotify",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching tracks", body = [TrackSummary]),
        (status = 400, description = "Invalid query"),
        (status = 502, description = "Spotify failed"),
        (status = 503, description = "Spotify credentials not configured")
    )
)]
pub async fn search_tracks(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<SearchQuery>>,
) -> Result<Json<Vec<TrackSummary>>, AppError> {
    let client = spotify_client(&state)?;
    let tracks = client
        .search_tracks(query.q.trim(), query.limit())
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(tracks))
}

/// Look up a single track.
#[utoipa::path(
    get,
    path = "/spotify/tracks/{id}",
    tag = "spotify",
    params(("id" = String, Path, description = "Spotify track identifier")),
    responses(
        (status = 200, description = "Track metadata", body = TrackSummary),
        (status = 400, description = "Malformed track identifier"),
        (status = 404, description = "Unknown track"),
        (status = 503, description = "Spotify credentials not configured")
    )
)]
pub async fn get_track(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TrackSummary>, AppError> {
    validate_track_id(&id)
        .map_err(|_| ServiceError::from(SpotifyError::InvalidTrackId(id.clone())))?;
    let client = spotify_client(&state)?;
    let track = client.get_track(&id).await.map_err(ServiceError::from)?;
    Ok(Json(track))
}

fn spotify_client(state: &SharedState) -> Result<&SpotifyClient, AppError> {
    state
        .spotify()
        .ok_or_else(|| ServiceError::from(SpotifyError::NotConfigured).into())
}
