use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::lobby::{
        RateSongRequest, RatingSummary, SongSummary, SuggestSongRequest, UpdateSongRequest,
    },
    error::AppError,
    routes::identity::CurrentUser,
    services::{rating_service, song_service},
    state::SharedState,
};

/// Song suggestion and rating endpoints nested under a lobby.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/lobbies/{id}/songs", post(suggest_song))
        .route(
            "/lobbies/{id}/songs/{song_id}",
            put(update_song).delete(delete_song),
        )
        .route("/lobbies/{id}/songs/{song_id}/ratings", post(rate_song))
}

/// Suggest a track for a round.
#[utoipa::path(
    post,
    path = "/lobbies/{id}/songs",
    tag = "songs",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    request_body = SuggestSongRequest,
    responses(
        (status = 201, description = "Song recorded", body = SongSummary),
        (status = 400, description = "Invalid track or round"),
        (status = 403, description = "Caller is not a participant"),
        (status = 409, description = "Caller already suggested a song for this round")
    )
)]
pub async fn suggest_song(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SuggestSongRequest>>,
) -> Result<(StatusCode, Json<SongSummary>), AppError> {
    let song = song_service::suggest_song(&state, id, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

/// Replace the track of an unrated song.
#[utoipa::path(
    put,
    path = "/lobbies/{id}/songs/{song_id}",
    tag = "songs",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier"),
        ("song_id" = Uuid, Path, description = "Song identifier")
    ),
    request_body = UpdateSongRequest,
    responses(
        (status = 200, description = "Song updated", body = SongSummary),
        (status = 403, description = "Caller did not suggest this song"),
        (status = 404, description = "Song not found"),
        (status = 409, description = "Song already rated")
    )
)]
pub async fn update_song(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path((id, song_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<UpdateSongRequest>>,
) -> Result<Json<SongSummary>, AppError> {
    Ok(Json(
        song_service::update_song(&state, id, song_id, user_id, payload).await?,
    ))
}

/// Delete an unrated song.
#[utoipa::path(
    delete,
    path = "/lobbies/{id}/songs/{song_id}",
    tag = "songs",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier"),
        ("song_id" = Uuid, Path, description = "Song identifier")
    ),
    responses(
        (status = 204, description = "Song deleted"),
        (status = 403, description = "Caller did not suggest this song"),
        (status = 404, description = "Song not found"),
        (status = 409, description = "Song already rated")
    )
)]
pub async fn delete_song(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path((id, song_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    song_service::delete_song(&state, id, song_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rate somebody else's song from 1 to 10.
#[utoipa::path(
    post,
    path = "/lobbies/{id}/songs/{song_id}/ratings",
    tag = "songs",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier"),
        ("song_id" = Uuid, Path, description = "Song identifier")
    ),
    request_body = RateSongRequest,
    responses(
        (status = 201, description = "Rating recorded", body = RatingSummary),
        (status = 400, description = "Out-of-range value or own song"),
        (status = 404, description = "Song not found"),
        (status = 409, description = "Song already rated by the caller")
    )
)]
pub async fn rate_song(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path((id, song_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<RateSongRequest>>,
) -> Result<(StatusCode, Json<RatingSummary>), AppError> {
    let rating = rating_service::rate_song(&state, id, song_id, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}
