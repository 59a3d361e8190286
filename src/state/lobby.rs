use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{GameModeEntity, LobbyEntity, ParticipantEntity, RatingEntity, SongEntity},
    state::completion::{self, Contestant, Evaluation, Suggestion, Vote},
};

/// Lowest accepted rating value.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating value.
pub const MAX_RATING: u8 = 10;

/// How players share the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Everybody plays on one shared device.
    SingleDevice,
    /// Every participant uses their own device.
    MultiDevice,
}

/// Member of a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// User identifier, unique within the lobby.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional avatar image URL.
    pub avatar_url: Option<String>,
    /// When the user joined the lobby.
    pub joined_at: SystemTime,
}

/// Track suggested by a participant for a given round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: Uuid,
    /// Spotify track identifier.
    pub track_id: String,
    pub suggested_by: Uuid,
    /// Round the song belongs to (1-based, at most `max_rounds`).
    pub round_number: u32,
    pub created_at: SystemTime,
}

/// Rating given by a participant on somebody else's song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub id: Uuid,
    pub song_id: Uuid,
    pub given_by: Uuid,
    /// Value within [`MIN_RATING`]..=[`MAX_RATING`].
    pub value: u8,
    pub created_at: SystemTime,
}

/// Where a visitor should be sent when opening a lobby page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyRoute {
    /// The visitor is a participant and the game is still running.
    Play,
    /// The game is over; everybody sees the results.
    Results,
    /// The visitor is not a participant yet.
    Join,
}

/// Rule violations raised by [`LobbySession`] mutations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("user `{0}` is not a participant of this lobby")]
    NotParticipant(Uuid),
    #[error("only the lobby host can do this")]
    NotHost,
    #[error("the host cannot leave their own lobby")]
    HostCannotLeave,
    #[error("round {round} is outside 1..={max_rounds}")]
    RoundOutOfRange { round: u32, max_rounds: u32 },
    #[error("a song was already suggested for round {0}")]
    SongAlreadySuggested(u32),
    #[error("song `{0}` not found in this lobby")]
    SongNotFound(Uuid),
    #[error("only the participant who suggested song `{0}` can change it")]
    NotSuggester(Uuid),
    #[error("song `{0}` has already been rated and can no longer change")]
    SongAlreadyRated(Uuid),
    #[error("rating {0} is outside 1..=10")]
    RatingOutOfRange(u8),
    #[error("participants cannot rate their own song")]
    SelfRating,
    #[error("song `{0}` was already rated by this participant")]
    DuplicateRating(Uuid),
}

/// Aggregate holding a lobby with all its participants, songs and ratings.
#[derive(Debug, Clone)]
pub struct LobbySession {
    pub id: Uuid,
    pub host_id: Uuid,
    pub category: Option<String>,
    /// Number of rounds, within `1..=max_rounds_limit` of the configuration.
    pub max_rounds: u32,
    pub game_mode: GameMode,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Participants in join order.
    pub participants: Vec<Participant>,
    pub songs: Vec<Song>,
    pub ratings: Vec<Rating>,
}

impl Participant {
    /// Build a participant joining now.
    pub fn new(id: Uuid, name: String, avatar_url: Option<String>) -> Self {
        Self {
            id,
            name,
            avatar_url,
            joined_at: SystemTime::now(),
        }
    }
}

impl LobbySession {
    /// Open a new lobby with `host` as its first participant.
    ///
    /// `max_rounds` is clamped to `1..=max_rounds_limit`.
    pub fn new(
        host: Participant,
        category: Option<String>,
        max_rounds: u32,
        game_mode: GameMode,
        max_rounds_limit: u32,
    ) -> Self {
        let timestamp = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            host_id: host.id,
            category,
            max_rounds: max_rounds.clamp(1, max_rounds_limit.max(1)),
            game_mode,
            created_at: timestamp,
            updated_at: timestamp,
            participants: vec![host],
            songs: Vec::new(),
            ratings: Vec::new(),
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_id == user_id
    }

    /// Add a participant. Returns `false` when the user already belongs to the lobby.
    pub fn join(&mut self, participant: Participant) -> bool {
        if self.is_participant(participant.id) {
            return false;
        }
        self.participants.push(participant);
        self.touch();
        true
    }

    /// Remove a participant. Songs and ratings they left behind stay in place.
    pub fn leave(&mut self, user_id: Uuid) -> Result<(), LobbyError> {
        self.ensure_participant(user_id)?;
        if self.is_host(user_id) {
            return Err(LobbyError::HostCannotLeave);
        }
        self.participants.retain(|p| p.id != user_id);
        self.touch();
        Ok(())
    }

    /// Only the host may delete a lobby.
    pub fn ensure_host(&self, user_id: Uuid) -> Result<(), LobbyError> {
        if self.is_host(user_id) {
            Ok(())
        } else {
            Err(LobbyError::NotHost)
        }
    }

    /// Record a suggestion for `round_number`, one per participant and round.
    pub fn suggest_song(
        &mut self,
        user_id: Uuid,
        track_id: String,
        round_number: u32,
    ) -> Result<&Song, LobbyError> {
        self.ensure_participant(user_id)?;

        if round_number == 0 || round_number > self.max_rounds {
            return Err(LobbyError::RoundOutOfRange {
                round: round_number,
                max_rounds: self.max_rounds,
            });
        }

        if self
            .songs
            .iter()
            .any(|song| song.suggested_by == user_id && song.round_number == round_number)
        {
            return Err(LobbyError::SongAlreadySuggested(round_number));
        }

        self.songs.push(Song {
            id: Uuid::new_v4(),
            track_id,
            suggested_by: user_id,
            round_number,
            created_at: SystemTime::now(),
        });
        self.touch();

        let index = self.songs.len() - 1;
        Ok(&self.songs[index])
    }

    /// Swap the track of an unrated song owned by `user_id`.
    pub fn replace_track(
        &mut self,
        user_id: Uuid,
        song_id: Uuid,
        track_id: String,
    ) -> Result<&Song, LobbyError> {
        let index = self.editable_song_index(user_id, song_id)?;
        self.songs[index].track_id = track_id;
        self.touch();
        Ok(&self.songs[index])
    }

    /// Delete an unrated song owned by `user_id`.
    pub fn remove_song(&mut self, user_id: Uuid, song_id: Uuid) -> Result<Song, LobbyError> {
        let index = self.editable_song_index(user_id, song_id)?;
        let removed = self.songs.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Rate somebody else's song once.
    pub fn rate_song(
        &mut self,
        user_id: Uuid,
        song_id: Uuid,
        value: u8,
    ) -> Result<&Rating, LobbyError> {
        self.ensure_participant(user_id)?;

        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(LobbyError::RatingOutOfRange(value));
        }

        let song = self
            .songs
            .iter()
            .find(|song| song.id == song_id)
            .ok_or(LobbyError::SongNotFound(song_id))?;

        if song.suggested_by == user_id {
            return Err(LobbyError::SelfRating);
        }

        if self
            .ratings
            .iter()
            .any(|rating| rating.song_id == song_id && rating.given_by == user_id)
        {
            return Err(LobbyError::DuplicateRating(song_id));
        }

        self.ratings.push(Rating {
            id: Uuid::new_v4(),
            song_id,
            given_by: user_id,
            value,
            created_at: SystemTime::now(),
        });
        self.touch();

        let index = self.ratings.len() - 1;
        Ok(&self.ratings[index])
    }

    /// First round not yet covered by every current participant, or the last
    /// round when all of them are.
    pub fn current_round(&self) -> u32 {
        let rounds = completion::suggesters_by_round(&self.songs);
        (1..=self.max_rounds)
            .find(|round| {
                rounds.get(round).is_none_or(|suggesters| {
                    !self.participants.iter().all(|p| suggesters.contains(&p.id))
                })
            })
            .unwrap_or(self.max_rounds)
    }

    /// Run the shared completion and leaderboard evaluation on this snapshot.
    pub fn evaluate(&self) -> Evaluation {
        completion::evaluate(
            self.max_rounds,
            &self.participants,
            &self.songs,
            &self.ratings,
        )
    }

    pub fn is_finished(&self) -> bool {
        completion::is_finished(
            self.max_rounds,
            self.participants.len(),
            &self.songs,
            &self.ratings,
        )
    }

    /// Decide which page a visitor lands on.
    pub fn route_for(&self, user_id: Uuid) -> LobbyRoute {
        if self.is_finished() {
            LobbyRoute::Results
        } else if self.is_participant(user_id) {
            LobbyRoute::Play
        } else {
            LobbyRoute::Join
        }
    }

    fn ensure_participant(&self, user_id: Uuid) -> Result<(), LobbyError> {
        if self.is_participant(user_id) {
            Ok(())
        } else {
            Err(LobbyError::NotParticipant(user_id))
        }
    }

    fn editable_song_index(&self, user_id: Uuid, song_id: Uuid) -> Result<usize, LobbyError> {
        let index = self
            .songs
            .iter()
            .position(|song| song.id == song_id)
            .ok_or(LobbyError::SongNotFound(song_id))?;

        if self.songs[index].suggested_by != user_id {
            return Err(LobbyError::NotSuggester(song_id));
        }

        if self.ratings.iter().any(|rating| rating.song_id == song_id) {
            return Err(LobbyError::SongAlreadyRated(song_id));
        }

        Ok(index)
    }

    fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

impl Contestant for Participant {
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

impl Suggestion for Song {
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

impl Vote for Rating {
    fn song_id(&self) -> Uuid {
        self.song_id
    }

    fn value(&self) -> u8 {
        self.value
    }
}

impl From<GameModeEntity> for GameMode {
    fn from(value: GameModeEntity) -> Self {
        match value {
            GameModeEntity::SingleDevice => GameMode::SingleDevice,
            GameModeEntity::MultiDevice => GameMode::MultiDevice,
        }
    }
}

impl From<GameMode> for GameModeEntity {
    fn from(value: GameMode) -> Self {
        match value {
            GameMode::SingleDevice => GameModeEntity::SingleDevice,
            GameMode::MultiDevice => GameModeEntity::MultiDevice,
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            avatar_url: value.avatar_url,
            joined_at: value.joined_at,
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            id: value.id,
            name: value.name,
            avatar_url: value.avatar_url,
            joined_at: value.joined_at,
        }
    }
}

impl From<SongEntity> for Song {
    fn from(value: SongEntity) -> Self {
        Self {
            id: value.id,
            track_id: value.track_id,
            suggested_by: value.suggested_by,
            round_number: value.round_number,
            created_at: value.created_at,
        }
    }
}

impl From<Song> for SongEntity {
    fn from(value: Song) -> Self {
        Self {
            id: value.id,
            track_id: value.track_id,
            suggested_by: value.suggested_by,
            round_number: value.round_number,
            created_at: value.created_at,
        }
    }
}

impl From<RatingEntity> for Rating {
    fn from(value: RatingEntity) -> Self {
        Self {
            id: value.id,
            song_id: value.song_id,
            given_by: value.given_by,
            value: value.value,
            created_at: value.created_at,
        }
    }
}

impl From<Rating> for RatingEntity {
    fn from(value: Rating) -> Self {
        Self {
            id: value.id,
            song_id: value.song_id,
            given_by: value.given_by,
            value: value.value,
            created_at: value.created_at,
        }
    }
}

impl From<LobbyEntity> for LobbySession {
    fn from(value: LobbyEntity) -> Self {
        Self {
            id: value.id,
            host_id: value.host_id,
            category: value.category,
            max_rounds: value.max_rounds,
            game_mode: value.game_mode.into(),
            created_at: value.created_at,
            updated_at: value.updated_at,
            participants: value.participants.into_iter().map(Into::into).collect(),
            songs: value.songs.into_iter().map(Into::into).collect(),
            ratings: value.ratings.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<LobbySession> for LobbyEntity {
    fn from(value: LobbySession) -> Self {
        Self {
            id: value.id,
            host_id: value.host_id,
            category: value.category,
            max_rounds: value.max_rounds,
            game_mode: value.game_mode.into(),
            created_at: value.created_at,
            updated_at: value.updated_at,
            participants: value.participants.into_iter().map(Into::into).collect(),
            songs: value.songs.into_iter().map(Into::into).collect(),
            ratings: value.ratings.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_A: &str = "4uLU6hMCjMI75M1A2tKUQC";
    const TRACK_B: &str = "7GhIk7Il098yCjg4BQjzvb";

    fn participant(name: &str) -> Participant {
        Participant::new(Uuid::new_v4(), name.into(), None)
    }

    fn lobby_with_guest(max_rounds: u32) -> (LobbySession, Uuid, Uuid) {
        let host = participant("host");
        let guest = participant("guest");
        let (host_id, guest_id) = (host.id, guest.id);
        let mut lobby = LobbySession::new(host, None, max_rounds, GameMode::MultiDevice, 10);
        assert!(lobby.join(guest));
        (lobby, host_id, guest_id)
    }

    #[test]
    fn max_rounds_is_clamped() {
        let low = LobbySession::new(participant("a"), None, 0, GameMode::SingleDevice, 10);
        assert_eq!(low.max_rounds, 1);

        let high = LobbySession::new(participant("b"), None, 42, GameMode::SingleDevice, 10);
        assert_eq!(high.max_rounds, 10);
    }

    #[test]
    fn join_is_idempotent() {
        let (mut lobby, _, guest) = lobby_with_guest(3);
        let again = Participant::new(guest, "guest again".into(), None);
        assert!(!lobby.join(again));
        assert_eq!(lobby.participants.len(), 2);
    }

    #[test]
    fn host_cannot_leave_but_guest_can() {
        let (mut lobby, host, guest) = lobby_with_guest(3);
        assert_eq!(lobby.leave(host), Err(LobbyError::HostCannotLeave));
        assert_eq!(lobby.leave(guest), Ok(()));
        assert_eq!(lobby.leave(guest), Err(LobbyError::NotParticipant(guest)));
    }

    #[test]
    fn one_song_per_participant_and_round() {
        let (mut lobby, host, _) = lobby_with_guest(2);
        lobby.suggest_song(host, TRACK_A.into(), 1).unwrap();

        assert_eq!(
            lobby.suggest_song(host, TRACK_B.into(), 1).unwrap_err(),
            LobbyError::SongAlreadySuggested(1)
        );
        assert!(lobby.suggest_song(host, TRACK_B.into(), 2).is_ok());
    }

    #[test]
    fn rounds_outside_the_lobby_range_are_rejected() {
        let (mut lobby, host, _) = lobby_with_guest(2);
        for round in [0, 3] {
            assert_eq!(
                lobby.suggest_song(host, TRACK_A.into(), round).unwrap_err(),
                LobbyError::RoundOutOfRange {
                    round,
                    max_rounds: 2
                }
            );
        }
    }

    #[test]
    fn outsiders_cannot_suggest_or_rate() {
        let (mut lobby, host, _) = lobby_with_guest(1);
        let stranger = Uuid::new_v4();
        let song_id = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;

        assert_eq!(
            lobby.suggest_song(stranger, TRACK_B.into(), 1).unwrap_err(),
            LobbyError::NotParticipant(stranger)
        );
        assert_eq!(
            lobby.rate_song(stranger, song_id, 5).unwrap_err(),
            LobbyError::NotParticipant(stranger)
        );
    }

    #[test]
    fn rating_rules_are_enforced() {
        let (mut lobby, host, guest) = lobby_with_guest(1);
        let song_id = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;

        assert_eq!(
            lobby.rate_song(host, song_id, 5).unwrap_err(),
            LobbyError::SelfRating
        );
        assert_eq!(
            lobby.rate_song(guest, song_id, 0).unwrap_err(),
            LobbyError::RatingOutOfRange(0)
        );
        assert_eq!(
            lobby.rate_song(guest, song_id, 11).unwrap_err(),
            LobbyError::RatingOutOfRange(11)
        );
        let missing = Uuid::new_v4();
        assert_eq!(
            lobby.rate_song(guest, missing, 5).unwrap_err(),
            LobbyError::SongNotFound(missing)
        );

        assert_eq!(lobby.rate_song(guest, song_id, 7).unwrap().value, 7);
        assert_eq!(
            lobby.rate_song(guest, song_id, 8).unwrap_err(),
            LobbyError::DuplicateRating(song_id)
        );
    }

    #[test]
    fn songs_are_editable_until_rated() {
        let (mut lobby, host, guest) = lobby_with_guest(1);
        let song_id = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;

        assert_eq!(
            lobby.replace_track(guest, song_id, TRACK_B.into()).unwrap_err(),
            LobbyError::NotSuggester(song_id)
        );
        assert_eq!(
            lobby
                .replace_track(host, song_id, TRACK_B.into())
                .unwrap()
                .track_id,
            TRACK_B
        );

        lobby.rate_song(guest, song_id, 6).unwrap();
        assert_eq!(
            lobby.replace_track(host, song_id, TRACK_A.into()).unwrap_err(),
            LobbyError::SongAlreadyRated(song_id)
        );
        assert_eq!(
            lobby.remove_song(host, song_id).unwrap_err(),
            LobbyError::SongAlreadyRated(song_id)
        );
    }

    #[test]
    fn unrated_song_can_be_removed() {
        let (mut lobby, host, _) = lobby_with_guest(1);
        let song_id = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;
        assert_eq!(lobby.remove_song(host, song_id).unwrap().id, song_id);
        assert!(lobby.songs.is_empty());
    }

    #[test]
    fn current_round_advances_as_rounds_fill() {
        let (mut lobby, host, guest) = lobby_with_guest(3);
        assert_eq!(lobby.current_round(), 1);

        lobby.suggest_song(host, TRACK_A.into(), 1).unwrap();
        assert_eq!(lobby.current_round(), 1);
        lobby.suggest_song(guest, TRACK_B.into(), 1).unwrap();
        assert_eq!(lobby.current_round(), 2);

        for round in 2..=3 {
            lobby.suggest_song(host, TRACK_A.into(), round).unwrap();
            lobby.suggest_song(guest, TRACK_B.into(), round).unwrap();
        }
        assert_eq!(lobby.current_round(), 3);
    }

    #[test]
    fn route_follows_membership_and_completion() {
        let (mut lobby, host, guest) = lobby_with_guest(1);
        let stranger = Uuid::new_v4();
        assert_eq!(lobby.route_for(host), LobbyRoute::Play);
        assert_eq!(lobby.route_for(stranger), LobbyRoute::Join);

        let host_song = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;
        lobby.suggest_song(guest, TRACK_B.into(), 1).unwrap();
        lobby.rate_song(guest, host_song, 9).unwrap();

        assert!(lobby.is_finished());
        assert_eq!(lobby.route_for(stranger), LobbyRoute::Results);
        assert_eq!(lobby.route_for(host), LobbyRoute::Results);
    }

    #[test]
    fn late_joiner_blocks_completion_until_final_song() {
        let (mut lobby, host, guest) = lobby_with_guest(1);
        let host_song = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;
        lobby.suggest_song(guest, TRACK_B.into(), 1).unwrap();
        lobby.rate_song(guest, host_song, 4).unwrap();
        assert!(lobby.is_finished());

        let late = participant("late");
        let late_id = late.id;
        lobby.join(late);
        assert!(!lobby.is_finished());

        lobby.suggest_song(late_id, TRACK_A.into(), 1).unwrap();
        assert!(lobby.is_finished());
    }

    #[test]
    fn entity_round_trip_keeps_the_aggregate() {
        let (mut lobby, host, guest) = lobby_with_guest(2);
        let song_id = lobby.suggest_song(host, TRACK_A.into(), 1).unwrap().id;
        lobby.rate_song(guest, song_id, 3).unwrap();

        let entity: LobbyEntity = lobby.clone().into();
        let restored: LobbySession = entity.into();
        assert_eq!(restored.participants, lobby.participants);
        assert_eq!(restored.songs, lobby.songs);
        assert_eq!(restored.ratings, lobby.ratings);
        assert_eq!(restored.game_mode, GameMode::MultiDevice);
    }
}
