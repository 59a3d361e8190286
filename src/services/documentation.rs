use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Empatify Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobby::create_lobby,
        crate::routes::lobby::list_lobbies,
        crate::routes::lobby::get_lobby,
        crate::routes::lobby::delete_lobby,
        crate::routes::lobby::get_lobby_status,
        crate::routes::lobby::join_lobby,
        crate::routes::lobby::leave_lobby,
        crate::routes::songs::suggest_song,
        crate::routes::songs::update_song,
        crate::routes::songs::delete_song,
        crate::routes::songs::rate_song,
        crate::routes::sse::lobby_stream,
        crate::routes::spotify::search_tracks,
        crate::routes::spotify::get_track,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::lobby::CreateLobbyRequest,
            crate::dto::lobby::JoinLobbyRequest,
            crate::dto::lobby::SuggestSongRequest,
            crate::dto::lobby::UpdateSongRequest,
            crate::dto::lobby::RateSongRequest,
            crate::dto::lobby::GameModeDto,
            crate::dto::lobby::LobbyRouteDto,
            crate::dto::lobby::LobbySummary,
            crate::dto::lobby::LobbyDetails,
            crate::dto::lobby::ParticipantSummary,
            crate::dto::lobby::SongSummary,
            crate::dto::lobby::RatingSummary,
            crate::dto::lobby::LeaderboardEntryDto,
            crate::dto::lobby::LobbyStateResponse,
            crate::dto::lobby::LobbyStatusResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::LobbyDeletedEvent,
            crate::dto::spotify::TrackSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobbies", description = "Lobby lifecycle and membership"),
        (name = "songs", description = "Song suggestions and ratings"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "spotify", description = "Spotify catalogue proxy"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_lobby_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/lobbies"));
        assert!(paths.contains_key("/lobbies/{id}/songs/{song_id}/ratings"));
        assert!(paths.contains_key("/spotify/search"));
    }
}
