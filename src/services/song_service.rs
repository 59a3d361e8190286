use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::lobby::{SongSummary, SuggestSongRequest, UpdateSongRequest},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Record the caller's suggestion for one round.
pub async fn suggest_song(
    state: &SharedState,
    lobby_id: Uuid,
    user_id: Uuid,
    request: SuggestSongRequest,
) -> Result<SongSummary, ServiceError> {
    let SuggestSongRequest {
        track_id,
        round_number,
    } = request;

    let (song, session) = state
        .run_lobby_mutation(lobby_id, move |session| {
            session
                .suggest_song(user_id, track_id, round_number)
                .map(SongSummary::from)
                .map_err(Into::into)
        })
        .await?;

    debug!(%lobby_id, %user_id, song_id = %song.id, round_number, "song suggested");
    sse_events::broadcast_lobby_updated(state, &session);
    Ok(song)
}

/// Swap the track of a song nobody has rated yet.
pub async fn update_song(
    state: &SharedState,
    lobby_id: Uuid,
    song_id: Uuid,
    user_id: Uuid,
    request: UpdateSongRequest,
) -> Result<SongSummary, ServiceError> {
    let (song, session) = state
        .run_lobby_mutation(lobby_id, move |session| {
            session
                .replace_track(user_id, song_id, request.track_id)
                .map(SongSummary::from)
                .map_err(Into::into)
        })
        .await?;

    sse_events::broadcast_lobby_updated(state, &session);
    Ok(song)
}

/// Withdraw a song nobody has rated yet.
pub async fn delete_song(
    state: &SharedState,
    lobby_id: Uuid,
    song_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let (_, session) = state
        .run_lobby_mutation(lobby_id, |session| {
            session.remove_song(user_id, song_id).map_err(Into::into)
        })
        .await?;

    debug!(%lobby_id, %song_id, "song removed");
    sse_events::broadcast_lobby_updated(state, &session);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::lobby_store::memory::MemoryLobbyStore,
        dto::lobby::{CreateLobbyRequest, GameModeDto, JoinLobbyRequest, RateSongRequest},
        services::{lobby_service, rating_service},
        state::AppState,
    };

    const TRACK_A: &str = "4uLU6hMCjMI75M1A2tKUQC";
    const TRACK_B: &str = "7GhIk7Il098yCjg4BQjzvb";

    async fn lobby_with_guest() -> (SharedState, Uuid, Uuid, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .set_lobby_store(Arc::new(MemoryLobbyStore::new()))
            .await;

        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let lobby = lobby_service::create_lobby(
            &state,
            host,
            CreateLobbyRequest {
                category: None,
                max_rounds: Some(2),
                game_mode: GameModeDto::MultiDevice,
                host_name: "Host".into(),
                host_avatar_url: None,
            },
        )
        .await
        .unwrap();
        let lobby_id = lobby.lobby.id;
        lobby_service::join_lobby(
            &state,
            lobby_id,
            guest,
            JoinLobbyRequest {
                name: "Guest".into(),
                avatar_url: None,
            },
        )
        .await
        .unwrap();

        (state, lobby_id, host, guest)
    }

    fn suggestion(track: &str, round_number: u32) -> SuggestSongRequest {
        SuggestSongRequest {
            track_id: track.into(),
            round_number,
        }
    }

    fn update(track: &str) -> UpdateSongRequest {
        UpdateSongRequest {
            track_id: track.into(),
        }
    }

    #[tokio::test]
    async fn update_replaces_track_until_rated() {
        let (state, lobby_id, host, guest) = lobby_with_guest().await;
        let song = suggest_song(&state, lobby_id, host, suggestion(TRACK_A, 1))
            .await
            .unwrap();

        let updated = update_song(&state, lobby_id, song.id, host, update(TRACK_B))
            .await
            .unwrap();
        assert_eq!(updated.id, song.id);
        assert_eq!(updated.track_id, TRACK_B);

        let foreign = update_song(&state, lobby_id, song.id, guest, update(TRACK_A)).await;
        assert!(matches!(foreign, Err(ServiceError::Forbidden(_))));

        rating_service::rate_song(
            &state,
            lobby_id,
            song.id,
            guest,
            RateSongRequest { rating_value: 8 },
        )
        .await
        .unwrap();

        let late = update_song(&state, lobby_id, song.id, host, update(TRACK_A)).await;
        assert!(matches!(late, Err(ServiceError::InvalidState(_))));
        let removal = delete_song(&state, lobby_id, song.id, host).await;
        assert!(matches!(removal, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn deleted_song_frees_the_round() {
        let (state, lobby_id, _, guest) = lobby_with_guest().await;
        let song = suggest_song(&state, lobby_id, guest, suggestion(TRACK_A, 2))
            .await
            .unwrap();

        delete_song(&state, lobby_id, song.id, guest).await.unwrap();
        let snapshot = lobby_service::get_lobby_state(&state, lobby_id).await.unwrap();
        assert!(snapshot.songs.is_empty());

        suggest_song(&state, lobby_id, guest, suggestion(TRACK_B, 2))
            .await
            .unwrap();

        let missing = update_song(&state, lobby_id, song.id, guest, update(TRACK_A)).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
