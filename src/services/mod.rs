/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Lobby lifecycle, membership and snapshots.
pub mod lobby_service;
/// Ratings on suggested songs.
pub mod rating_service;
/// Song suggestions, edits and removals.
pub mod song_service;
/// Spotify Web API client and token cache.
pub mod spotify;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with exponential backoff.
pub mod storage_supervisor;
