use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::lobby::LobbyStateResponse;

/// Name of the event carrying a fresh lobby snapshot.
pub const LOBBY_UPDATED: &str = "lobby.updated";
/// Name of the event announcing that a lobby was deleted by its host.
pub const LOBBY_DELETED: &str = "lobby.deleted";
/// Name of the first event of every stream.
pub const HANDSHAKE: &str = "handshake";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    pub lobby_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast after every successful lobby mutation.
pub struct LobbyUpdatedEvent(pub LobbyStateResponse);

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast right before a lobby's stream is closed because the host deleted it.
pub struct LobbyDeletedEvent {
    pub lobby_id: Uuid,
}
