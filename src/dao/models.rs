use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Game mode as persisted by the storage layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameModeEntity {
    SingleDevice,
    MultiDevice,
}

/// Member of a lobby as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// User identifier of the participant.
    pub id: Uuid,
    /// Display name at join time.
    pub name: String,
    /// Optional avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// When the user joined the lobby.
    pub joined_at: SystemTime,
}

/// Track suggestion persisted inside its lobby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongEntity {
    /// Stable identifier for the song.
    pub id: Uuid,
    /// Spotify track identifier.
    pub track_id: String,
    /// Participant who suggested the track.
    pub suggested_by: Uuid,
    /// Round the track was suggested for.
    pub round_number: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Rating persisted inside its lobby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingEntity {
    /// Stable identifier for the rating.
    pub id: Uuid,
    /// Song being rated.
    pub song_id: Uuid,
    /// Participant who gave the rating.
    pub given_by: Uuid,
    /// Rating value (1 to 10).
    pub value: u8,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Aggregate lobby entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyEntity {
    /// Primary key of the lobby.
    pub id: Uuid,
    /// User who created the lobby.
    pub host_id: Uuid,
    /// Optional theme chosen by the host (e.g. "90s rock").
    #[serde(default)]
    pub category: Option<String>,
    /// Number of rounds to play.
    pub max_rounds: u32,
    /// Whether the game is played on one device or many.
    pub game_mode: GameModeEntity,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the lobby was updated.
    pub updated_at: SystemTime,
    /// Participants in join order.
    pub participants: Vec<ParticipantEntity>,
    /// Every song suggested so far, across all rounds.
    #[serde(default)]
    pub songs: Vec<SongEntity>,
    /// Every rating given so far.
    #[serde(default)]
    pub ratings: Vec<RatingEntity>,
}

/// Lobby list item entity (subset of [`LobbyEntity`]) returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyListItemEntity {
    /// Primary key of the lobby.
    pub id: Uuid,
    /// User who created the lobby.
    pub host_id: Uuid,
    /// Optional theme chosen by the host.
    pub category: Option<String>,
    /// Number of rounds to play.
    pub max_rounds: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Identifiers of the current participants.
    pub participant_ids: Vec<Uuid>,
}

impl From<LobbyEntity> for LobbyListItemEntity {
    fn from(entity: LobbyEntity) -> Self {
        Self {
            id: entity.id,
            host_id: entity.host_id,
            category: entity.category,
            max_rounds: entity.max_rounds,
            created_at: entity.created_at,
            participant_ids: entity.participants.into_iter().map(|p| p.id).collect(),
        }
    }
}
