use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::lobby::{
        CreateLobbyRequest, JoinLobbyRequest, LobbyStateResponse, LobbyStatusResponse,
        LobbySummary,
    },
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        lobby::{LobbySession, Participant},
    },
};

/// Open a new lobby hosted by `user_id`.
pub async fn create_lobby(
    state: &SharedState,
    user_id: Uuid,
    request: CreateLobbyRequest,
) -> Result<LobbyStateResponse, ServiceError> {
    let store = state.require_lobby_store().await?;
    let config = state.config();

    let host = Participant::new(
        user_id,
        display_name(&request.host_name)?,
        request.host_avatar_url,
    );
    let category = request
        .category
        .map(|category| category.trim().to_owned())
        .filter(|category| !category.is_empty());
    let max_rounds = request.max_rounds.unwrap_or(config.default_max_rounds);

    let session = LobbySession::new(
        host,
        category,
        max_rounds,
        request.game_mode.into(),
        config.max_rounds_limit,
    );
    store.save_lobby(session.clone().into()).await?;

    info!(
        lobby_id = %session.id,
        host_id = %user_id,
        max_rounds = session.max_rounds,
        "lobby created"
    );
    Ok(LobbyStateResponse::from(&session))
}

/// Add `user_id` to the lobby. Joining twice is a no-op.
pub async fn join_lobby(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
    request: JoinLobbyRequest,
) -> Result<LobbyStateResponse, ServiceError> {
    let participant = Participant::new(user_id, display_name(&request.name)?, request.avatar_url);

    let (joined, session) = state
        .run_lobby_mutation(lobby_id, move |session| Ok(session.join(participant)))
        .await?;

    if joined {
        debug!(%lobby_id, %user_id, "participant joined lobby");
        sse_events::broadcast_lobby_updated(state, &session);
    }
    Ok(LobbyStateResponse::from(&session))
}

/// Remove `user_id` from the lobby; their songs and ratings stay.
pub async fn leave_lobby(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let ((), session) = state
        .run_lobby_mutation(lobby_id, |session| {
            session.leave(user_id).map_err(Into::into)
        })
        .await?;

    debug!(%lobby_id, %user_id, "participant left lobby");
    sse_events::broadcast_lobby_updated(state, &session);
    Ok(())
}

/// Delete the lobby. Only its host may do so.
pub async fn delete_lobby(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    state
        .run_lobby_removal(lobby_id, |session| {
            session.ensure_host(user_id).map_err(Into::into)
        })
        .await?;

    info!(%lobby_id, host_id = %user_id, "lobby deleted");
    sse_events::broadcast_lobby_deleted(state, lobby_id);
    Ok(())
}

/// Lobbies `user_id` currently participates in, newest first.
pub async fn list_lobbies_for(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<LobbySummary>, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobbies = store.list_lobbies().await?;

    Ok(lobbies
        .into_iter()
        .filter(|item| item.participant_ids.contains(&user_id))
        .map(LobbySummary::from)
        .collect())
}

/// Full snapshot with the evaluated leaderboard and completion flag.
pub async fn get_lobby_state(
    state: &SharedState,
    lobby_id: Uuid,
) -> Result<LobbyStateResponse, ServiceError> {
    let session = load_lobby(state, lobby_id).await?;
    Ok(LobbyStateResponse::from(&session))
}

/// Which page `user_id` should land on for this lobby.
pub async fn get_lobby_status(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
) -> Result<LobbyStatusResponse, ServiceError> {
    let session = load_lobby(state, lobby_id).await?;
    Ok(LobbyStatusResponse::for_user(&session, user_id))
}

/// Read a lobby without taking its write lock.
pub async fn load_lobby(state: &SharedState, lobby_id: Uuid) -> Result<LobbySession, ServiceError> {
    let store = state.require_lobby_store().await?;
    store
        .find_lobby(lobby_id)
        .await?
        .map(LobbySession::from)
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{lobby_id}` not found")))
}

fn display_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "display name must not be empty".into(),
        ));
    }
    Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::lobby_store::memory::MemoryLobbyStore,
        dto::lobby::{GameModeDto, LobbyRouteDto},
        state::AppState,
    };

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .set_lobby_store(Arc::new(MemoryLobbyStore::new()))
            .await;
        state
    }

    fn create_request(max_rounds: Option<u32>) -> CreateLobbyRequest {
        CreateLobbyRequest {
            category: Some("  Summer hits ".into()),
            max_rounds,
            game_mode: GameModeDto::MultiDevice,
            host_name: "Host".into(),
            host_avatar_url: None,
        }
    }

    fn join_request(name: &str) -> JoinLobbyRequest {
        JoinLobbyRequest {
            name: name.into(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_clamps() {
        let state = ready_state().await;

        let lobby = create_lobby(&state, Uuid::new_v4(), create_request(None))
            .await
            .unwrap();
        assert_eq!(lobby.lobby.max_rounds, 5);
        assert_eq!(lobby.lobby.category.as_deref(), Some("Summer hits"));

        let big = create_lobby(&state, Uuid::new_v4(), create_request(Some(42)))
            .await
            .unwrap();
        assert_eq!(big.lobby.max_rounds, 10);

        let tiny = create_lobby(&state, Uuid::new_v4(), create_request(Some(0)))
            .await
            .unwrap();
        assert_eq!(tiny.lobby.max_rounds, 1);
    }

    #[tokio::test]
    async fn degraded_state_rejects_operations() {
        let state = AppState::new(AppConfig::default());
        let result = create_lobby(&state, Uuid::new_v4(), create_request(None)).await;
        assert!(matches!(result, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn listing_only_shows_own_lobbies() {
        let state = ready_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let lobby = create_lobby(&state, host, create_request(None)).await.unwrap();
        join_lobby(&state, lobby.lobby.id, guest, join_request("Guest"))
            .await
            .unwrap();

        assert_eq!(list_lobbies_for(&state, host).await.unwrap().len(), 1);
        assert_eq!(list_lobbies_for(&state, guest).await.unwrap().len(), 1);
        assert!(list_lobbies_for(&state, stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_routes_visitors_to_join() {
        let state = ready_state().await;
        let host = Uuid::new_v4();
        let lobby = create_lobby(&state, host, create_request(None)).await.unwrap();

        let own = get_lobby_status(&state, lobby.lobby.id, host).await.unwrap();
        assert_eq!(own.route, LobbyRouteDto::Play);

        let visitor = get_lobby_status(&state, lobby.lobby.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(visitor.route, LobbyRouteDto::Join);
        assert!(!visitor.is_finished);
    }

    #[tokio::test]
    async fn only_host_deletes_and_watchers_hear_about_it() {
        let state = ready_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let lobby = create_lobby(&state, host, create_request(None)).await.unwrap();
        let lobby_id = lobby.lobby.id;
        join_lobby(&state, lobby_id, guest, join_request("Guest"))
            .await
            .unwrap();

        let mut events = state.lobby_hubs().subscribe(lobby_id);

        let denied = delete_lobby(&state, lobby_id, guest).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        delete_lobby(&state, lobby_id, host).await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("lobby.deleted"));

        assert!(matches!(
            get_lobby_state(&state, lobby_id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn host_cannot_leave_but_guest_can() {
        let state = ready_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let lobby = create_lobby(&state, host, create_request(None)).await.unwrap();
        let lobby_id = lobby.lobby.id;
        join_lobby(&state, lobby_id, guest, join_request("Guest"))
            .await
            .unwrap();

        assert!(matches!(
            leave_lobby(&state, lobby_id, host).await,
            Err(ServiceError::InvalidState(_))
        ));
        leave_lobby(&state, lobby_id, guest).await.unwrap();

        let snapshot = get_lobby_state(&state, lobby_id).await.unwrap();
        assert_eq!(snapshot.participants.len(), 1);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let state = ready_state().await;
        let lobby = create_lobby(&state, Uuid::new_v4(), create_request(None))
            .await
            .unwrap();

        let result = join_lobby(&state, lobby.lobby.id, Uuid::new_v4(), join_request("   ")).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }
}
