use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::lobby::{RateSongRequest, RatingSummary},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Rate another participant's song. Logs when the rating completes the game.
pub async fn rate_song(
    state: &SharedState,
    lobby_id: Uuid,
    song_id: Uuid,
    user_id: Uuid,
    request: RateSongRequest,
) -> Result<RatingSummary, ServiceError> {
    let (rating, session) = state
        .run_lobby_mutation(lobby_id, move |session| {
            session
                .rate_song(user_id, song_id, request.rating_value)
                .map(RatingSummary::from)
                .map_err(Into::into)
        })
        .await?;

    debug!(%lobby_id, %song_id, %user_id, value = rating.rating_value, "song rated");
    if session.is_finished() {
        info!(%lobby_id, "lobby finished");
    }

    sse_events::broadcast_lobby_updated(state, &session);
    Ok(rating)
}
