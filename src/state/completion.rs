//! Completion detection and leaderboard aggregation over a lobby snapshot.
//!
//! Both the HTTP layer and the polling client call into this module so the
//! "is the game over" rule lives in exactly one place. Everything here is pure:
//! callers hand in already-materialised participants, songs and ratings.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Read access to a lobby participant, as needed by the leaderboard.
pub trait Contestant {
    /// Identifier of the participant (the user id).
    fn id(&self) -> Uuid;
    /// Display name shown on the leaderboard.
    fn name(&self) -> &str;
    /// Optional avatar reference shown on the leaderboard.
    fn avatar_url(&self) -> Option<&str>;
}

/// Read access to a suggested song.
pub trait Suggestion {
    /// Identifier of the song.
    fn id(&self) -> Uuid;
    /// Participant who suggested the song.
    fn suggested_by(&self) -> Uuid;
    /// Round the song was suggested for (1-based).
    fn round_number(&self) -> u32;
}

/// Read access to a rating given on a song.
pub trait Vote {
    /// Song the rating targets.
    fn song_id(&self) -> Uuid;
    /// Rating value, nominally within `1..=10`.
    fn value(&self) -> u8;
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Mean of every rating received across all songs, `0.0` when unrated.
    pub average_rating: f64,
    pub songs_suggested: usize,
}

/// Outcome of evaluating a lobby snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub is_finished: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Evaluate completion and compute the ranked leaderboard in one pass.
pub fn evaluate<P, S, R>(
    max_rounds: u32,
    participants: &[P],
    songs: &[S],
    ratings: &[R],
) -> Evaluation
where
    P: Contestant,
    S: Suggestion,
    R: Vote,
{
    Evaluation {
        is_finished: is_finished(max_rounds, participants.len(), songs, ratings),
        leaderboard: leaderboard(participants, songs, ratings),
    }
}

/// Return `true` once every current participant has a song in round
/// `max_rounds` and at least one rating exists anywhere in the lobby.
///
/// The rating does not have to target a final-round song, and the final round
/// must be covered by exactly `participant_count` distinct suggesters.
pub fn is_finished<S, R>(max_rounds: u32, participant_count: usize, songs: &[S], ratings: &[R]) -> bool
where
    S: Suggestion,
    R: Vote,
{
    if songs.is_empty() || participant_count <= 1 {
        return false;
    }

    let last_round_complete = suggesters_by_round(songs)
        .get(&max_rounds)
        .is_some_and(|suggesters| suggesters.len() == participant_count);

    last_round_complete && !ratings.is_empty()
}

/// Build the leaderboard: one entry per participant, sorted by descending
/// average rating. Ties keep the order of `participants`.
pub fn leaderboard<P, S, R>(participants: &[P], songs: &[S], ratings: &[R]) -> Vec<LeaderboardEntry>
where
    P: Contestant,
    S: Suggestion,
    R: Vote,
{
    let song_owners = songs
        .iter()
        .map(|song| (song.id(), song.suggested_by()))
        .collect::<HashMap<_, _>>();

    let mut songs_per_user: HashMap<Uuid, usize> = HashMap::new();
    for song in songs {
        *songs_per_user.entry(song.suggested_by()).or_default() += 1;
    }

    // (sum, count) of ratings received per suggester; ratings on unknown songs are dropped.
    let mut received: HashMap<Uuid, (u64, u64)> = HashMap::new();
    for rating in ratings {
        if let Some(owner) = song_owners.get(&rating.song_id()) {
            let totals = received.entry(*owner).or_default();
            totals.0 += u64::from(rating.value());
            totals.1 += 1;
        }
    }

    let mut entries = participants
        .iter()
        .map(|participant| {
            let average_rating = match received.get(&participant.id()) {
                Some(&(sum, count)) if count > 0 => sum as f64 / count as f64,
                _ => 0.0,
            };

            LeaderboardEntry {
                user_id: participant.id(),
                name: participant.name().to_owned(),
                avatar_url: participant.avatar_url().map(str::to_owned),
                average_rating,
                songs_suggested: songs_per_user
                    .get(&participant.id())
                    .copied()
                    .unwrap_or(0),
            }
        })
        .collect::<Vec<_>>();

    // `sort_by` is stable, so equal averages keep their join order.
    entries.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
    entries
}

/// Distinct suggesters per round. A participant submitting twice in the same
/// round is counted once.
pub(crate) fn suggesters_by_round<S: Suggestion>(songs: &[S]) -> HashMap<u32, HashSet<Uuid>> {
    let mut rounds: HashMap<u32, HashSet<Uuid>> = HashMap::new();
    for song in songs {
        rounds
            .entry(song.round_number())
            .or_default()
            .insert(song.suggested_by());
    }
    rounds
}
