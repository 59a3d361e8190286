use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        lobby::LobbyStateResponse,
        sse::{LOBBY_DELETED, LOBBY_UPDATED, LobbyDeletedEvent, LobbyUpdatedEvent, ServerEvent},
    },
    state::{SharedState, lobby::LobbySession},
};

/// Push the new snapshot of `session` to everyone watching the lobby.
pub fn broadcast_lobby_updated(state: &SharedState, session: &LobbySession) {
    let payload = LobbyUpdatedEvent(LobbyStateResponse::from(session));
    send_lobby_event(state, session.id, LOBBY_UPDATED, &payload);
}

/// Tell watchers the lobby is gone, then close its stream.
pub fn broadcast_lobby_deleted(state: &SharedState, lobby_id: Uuid) {
    send_lobby_event(state, lobby_id, LOBBY_DELETED, &LobbyDeletedEvent { lobby_id });
    state.lobby_hubs().close(lobby_id);
}

fn send_lobby_event(state: &SharedState, lobby_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.lobby_hubs().broadcast(lobby_id, event),
        Err(err) => warn!(%lobby_id, event, error = %err, "failed to serialize lobby SSE payload"),
    }
}
