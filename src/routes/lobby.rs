use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::lobby::{
        CreateLobbyRequest, JoinLobbyRequest, LobbyStateResponse, LobbyStatusResponse,
        LobbySummary,
    },
    error::AppError,
    routes::identity::CurrentUser,
    services::lobby_service,
    state::SharedState,
};

/// Lobby lifecycle endpoints. Expects [`CurrentUser`] in the request extensions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/lobbies", get(list_lobbies).post(create_lobby))
        .route("/lobbies/{id}", get(get_lobby).delete(delete_lobby))
        .route("/lobbies/{id}/status", get(get_lobby_status))
        .route("/lobbies/{id}/participants", post(join_lobby))
        .route("/lobbies/{id}/participants/me", delete(leave_lobby))
}

/// Open a new lobby; the caller becomes its host and first participant.
#[utoipa::path(
    post,
    path = "/lobbies",
    tag = "lobbies",
    params(("X-User-Id" = String, Header, description = "Authenticated user id (UUID)")),
    request_body = CreateLobbyRequest,
    responses(
        (status = 201, description = "Lobby created", body = LobbyStateResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or malformed user header"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_lobby(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Valid(Json(payload)): Valid<Json<CreateLobbyRequest>>,
) -> Result<(StatusCode, Json<LobbyStateResponse>), AppError> {
    let lobby = lobby_service::create_lobby(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(lobby)))
}

/// List the lobbies the caller participates in.
#[utoipa::path(
    get,
    path = "/lobbies",
    tag = "lobbies",
    params(("X-User-Id" = String, Header, description = "Authenticated user id (UUID)")),
    responses(
        (status = 200, description = "Lobbies of the caller, newest first", body = [LobbySummary]),
        (status = 401, description = "Missing or malformed user header"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_lobbies(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<LobbySummary>>, AppError> {
    Ok(Json(lobby_service::list_lobbies_for(&state, user_id).await?))
}

/// Full lobby snapshot including the leaderboard and the completion flag.
#[utoipa::path(
    get,
    path = "/lobbies/{id}",
    tag = "lobbies",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    responses(
        (status = 200, description = "Lobby snapshot", body = LobbyStateResponse),
        (status = 404, description = "Lobby not found"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyStateResponse>, AppError> {
    Ok(Json(lobby_service::get_lobby_state(&state, id).await?))
}

/// Delete a lobby. Host only.
#[utoipa::path(
    delete,
    path = "/lobbies/{id}",
    tag = "lobbies",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    responses(
        (status = 204, description = "Lobby deleted"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Lobby not found")
    )
)]
pub async fn delete_lobby(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lobby_service::delete_lobby(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tell the frontend which page to render for the caller.
#[utoipa::path(
    get,
    path = "/lobbies/{id}/status",
    tag = "lobbies",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    responses(
        (status = 200, description = "Routing decision", body = LobbyStatusResponse),
        (status = 404, description = "Lobby not found")
    )
)]
pub async fn get_lobby_status(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyStatusResponse>, AppError> {
    Ok(Json(
        lobby_service::get_lobby_status(&state, id, user_id).await?,
    ))
}

/// Join a lobby. Joining again returns the snapshot unchanged.
#[utoipa::path(
    post,
    path = "/lobbies/{id}/participants",
    tag = "lobbies",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    request_body = JoinLobbyRequest,
    responses(
        (status = 200, description = "Caller is a participant", body = LobbyStateResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Lobby not found")
    )
)]
pub async fn join_lobby(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JoinLobbyRequest>>,
) -> Result<Json<LobbyStateResponse>, AppError> {
    Ok(Json(
        lobby_service::join_lobby(&state, id, user_id, payload).await?,
    ))
}

/// Leave a lobby. The host deletes the lobby instead.
#[utoipa::path(
    delete,
    path = "/lobbies/{id}/participants/me",
    tag = "lobbies",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    responses(
        (status = 204, description = "Caller left the lobby"),
        (status = 403, description = "Caller is not a participant"),
        (status = 409, description = "The host cannot leave")
    )
)]
pub async fn leave_lobby(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lobby_service::leave_lobby(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
