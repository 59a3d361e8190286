use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::LobbyListItemEntity,
    dto::{format_system_time, validation::validate_track_id},
    state::{
        completion::{Contestant, LeaderboardEntry, Suggestion, Vote},
        lobby::{GameMode, LobbyRoute, LobbySession, Participant, Rating, Song},
    },
};

/// Payload used to open a new lobby; the caller becomes its host.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    /// Theme of the lobby, e.g. "Songs for a road trip".
    #[validate(length(max = 120))]
    pub category: Option<String>,
    /// Requested round count. Clamped to the configured limit; defaults from configuration.
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub game_mode: GameModeDto,
    #[validate(length(min = 1, max = 50))]
    pub host_name: String,
    #[validate(url)]
    pub host_avatar_url: Option<String>,
}

/// Payload sent by a user joining a lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Suggest a track for one round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuggestSongRequest {
    /// Spotify track identifier (22 base-62 characters).
    #[validate(custom(function = "validate_track_id"))]
    pub track_id: String,
    #[validate(range(min = 1))]
    pub round_number: u32,
}

/// Replace the track of a song that has not been rated yet.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSongRequest {
    #[validate(custom(function = "validate_track_id"))]
    pub track_id: String,
}

/// Rate another participant's song.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateSongRequest {
    #[validate(range(min = 1, max = 10))]
    pub rating_value: u8,
}

/// Wire representation of [`GameMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameModeDto {
    SingleDevice,
    #[default]
    MultiDevice,
}

impl From<GameModeDto> for GameMode {
    fn from(value: GameModeDto) -> Self {
        match value {
            GameModeDto::SingleDevice => GameMode::SingleDevice,
            GameModeDto::MultiDevice => GameMode::MultiDevice,
        }
    }
}

impl From<GameMode> for GameModeDto {
    fn from(value: GameMode) -> Self {
        match value {
            GameMode::SingleDevice => GameModeDto::SingleDevice,
            GameMode::MultiDevice => GameModeDto::MultiDevice,
        }
    }
}

/// Page a visitor should be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LobbyRouteDto {
    Play,
    Results,
    Join,
}

impl From<LobbyRoute> for LobbyRouteDto {
    fn from(value: LobbyRoute) -> Self {
        match value {
            LobbyRoute::Play => LobbyRouteDto::Play,
            LobbyRoute::Results => LobbyRouteDto::Results,
            LobbyRoute::Join => LobbyRouteDto::Join,
        }
    }
}

/// Entry of `GET /lobbies`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub id: Uuid,
    pub host_id: Uuid,
    pub category: Option<String>,
    pub max_rounds: u32,
    pub created_at: String,
    pub participant_count: usize,
}

impl From<LobbyListItemEntity> for LobbySummary {
    fn from(item: LobbyListItemEntity) -> Self {
        Self {
            id: item.id,
            host_id: item.host_id,
            category: item.category,
            max_rounds: item.max_rounds,
            created_at: format_system_time(item.created_at),
            participant_count: item.participant_ids.len(),
        }
    }
}

/// Lobby metadata without its children.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyDetails {
    pub id: Uuid,
    pub host_id: Uuid,
    pub category: Option<String>,
    pub max_rounds: u32,
    pub game_mode: GameModeDto,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub joined_at: String,
}

impl From<&Participant> for ParticipantSummary {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            avatar_url: participant.avatar_url.clone(),
            joined_at: format_system_time(participant.joined_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongSummary {
    pub id: Uuid,
    pub track_id: String,
    pub suggested_by: Uuid,
    pub round_number: u32,
    pub created_at: String,
}

impl From<&Song> for SongSummary {
    fn from(song: &Song) -> Self {
        Self {
            id: song.id,
            track_id: song.track_id.clone(),
            suggested_by: song.suggested_by,
            round_number: song.round_number,
            created_at: format_system_time(song.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub id: Uuid,
    pub song_id: Uuid,
    pub given_by: Uuid,
    pub rating_value: u8,
    pub created_at: String,
}

impl From<&Rating> for RatingSummary {
    fn from(rating: &Rating) -> Self {
        Self {
            id: rating.id,
            song_id: rating.song_id,
            given_by: rating.given_by,
            rating_value: rating.value,
            created_at: format_system_time(rating.created_at),
        }
    }
}

/// Ranked leaderboard row, best average first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub average_rating: f64,
    pub songs_suggested: usize,
}

impl From<LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            user_id: entry.user_id,
            name: entry.name,
            avatar_url: entry.avatar_url,
            average_rating: entry.average_rating,
            songs_suggested: entry.songs_suggested,
        }
    }
}

/// Full lobby snapshot returned by `GET /lobbies/{id}` and pushed on `lobby.updated`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStateResponse {
    pub lobby: LobbyDetails,
    pub participants: Vec<ParticipantSummary>,
    pub songs: Vec<SongSummary>,
    pub ratings: Vec<RatingSummary>,
    pub leaderboard: Vec<LeaderboardEntryDto>,
    pub is_finished: bool,
    pub current_round: u32,
}

impl From<&LobbySession> for LobbyStateResponse {
    fn from(session: &LobbySession) -> Self {
        let evaluation = session.evaluate();
        Self {
            lobby: LobbyDetails {
                id: session.id,
                host_id: session.host_id,
                category: session.category.clone(),
                max_rounds: session.max_rounds,
                game_mode: session.game_mode.into(),
                created_at: format_system_time(session.created_at),
                updated_at: format_system_time(session.updated_at),
            },
            participants: session.participants.iter().map(Into::into).collect(),
            songs: session.songs.iter().map(Into::into).collect(),
            ratings: session.ratings.iter().map(Into::into).collect(),
            leaderboard: evaluation.leaderboard.into_iter().map(Into::into).collect(),
            is_finished: evaluation.is_finished,
            current_round: session.current_round(),
        }
    }
}

/// Routing decision returned by `GET /lobbies/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStatusResponse {
    pub is_finished: bool,
    pub route: LobbyRouteDto,
    pub current_round: u32,
}

impl LobbyStatusResponse {
    pub fn for_user(session: &LobbySession, user_id: Uuid) -> Self {
        Self {
            is_finished: session.is_finished(),
            route: session.route_for(user_id).into(),
            current_round: session.current_round(),
        }
    }
}

// The polling client re-runs the evaluator directly on the wire shapes.

impl Contestant for ParticipantSummary {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }
}

impl Suggestion for SongSummary {
    fn id(&self) -> Uuid {
        self.id
    }

    fn suggested_by(&self) -> Uuid {
        self.suggested_by
    }

    fn round_number(&self) -> u32 {
        self.round_number
    }
}

impl Vote for RatingSummary {
    fn song_id(&self) -> Uuid {
        self.song_id
    }

    fn value(&self) -> u8 {
        self.rating_value
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn state_response_uses_camel_case() {
        let host = Participant::new(Uuid::new_v4(), "Host".into(), None);
        let session = LobbySession::new(host, None, 2, GameMode::SingleDevice, 10);

        let value = serde_json::to_value(LobbyStateResponse::from(&session)).unwrap();

        assert_eq!(value["isFinished"], json!(false));
        assert_eq!(value["currentRound"], json!(1));
        assert_eq!(value["lobby"]["maxRounds"], json!(2));
        assert_eq!(value["lobby"]["gameMode"], json!("single_device"));
        assert_eq!(value["leaderboard"][0]["averageRating"], json!(0.0));
    }

    #[test]
    fn create_request_defaults_game_mode() {
        let request: CreateLobbyRequest =
            serde_json::from_value(json!({"hostName": "Ada", "category": "Rainy day"})).unwrap();
        assert_eq!(request.game_mode, GameModeDto::MultiDevice);
        assert!(request.max_rounds.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn suggest_request_rejects_malformed_track() {
        let request = SuggestSongRequest {
            track_id: "not-a-track".into(),
            round_number: 1,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn rate_request_bounds() {
        assert!(RateSongRequest { rating_value: 0 }.validate().is_err());
        assert!(RateSongRequest { rating_value: 10 }.validate().is_ok());
        assert!(RateSongRequest { rating_value: 11 }.validate().is_err());
    }

    #[test]
    fn missing_required_field_fails_to_decode() {
        let raw = json!({"id": Uuid::new_v4(), "suggestedBy": Uuid::new_v4(), "roundNumber": 1});
        assert!(serde_json::from_value::<SongSummary>(raw).is_err());
    }
}
