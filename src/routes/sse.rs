use std::convert::Infallible;

use axum::{
    Extension, Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError, routes::identity::CurrentUser, services::sse_service, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/lobbies/{id}/events",
    tag = "sse",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id (UUID)"),
        ("id" = Uuid, Path, description = "Lobby identifier")
    ),
    responses(
        (status = 200, description = "Lobby SSE stream (`handshake`, `lobby.updated`, `lobby.deleted`)", content_type = "text/event-stream", body = String),
        (status = 404, description = "Lobby not found")
    )
)]
/// Stream realtime updates of one lobby.
pub async fn lobby_stream(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe_lobby(&state, id).await?;
    info!(lobby_id = %id, %user_id, "new lobby SSE connection");
    Ok(sse_service::to_sse_stream(state, id, receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/lobbies/{id}/events", get(lobby_stream))
}
