use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{dao::storage::StorageError, services::spotify::SpotifyError, state::lobby::LobbyError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Caller is known but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
    /// An optional integration is switched off.
    #[error("not configured: {0}")]
    NotConfigured(String),
    /// A third-party dependency failed.
    #[error("upstream failure: {0}")]
    Upstream(String),
    /// Stored data could not be interpreted.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Corrupted { .. } => ServiceError::Internal(err.to_string()),
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<LobbyError> for ServiceError {
    fn from(err: LobbyError) -> Self {
        let message = err.to_string();
        match err {
            LobbyError::NotParticipant(_) | LobbyError::NotHost | LobbyError::NotSuggester(_) => {
                ServiceError::Forbidden(message)
            }
            LobbyError::RoundOutOfRange { .. }
            | LobbyError::RatingOutOfRange(_)
            | LobbyError::SelfRating => ServiceError::InvalidInput(message),
            LobbyError::HostCannotLeave
            | LobbyError::SongAlreadySuggested(_)
            | LobbyError::SongAlreadyRated(_)
            | LobbyError::DuplicateRating(_) => ServiceError::InvalidState(message),
            LobbyError::SongNotFound(_) => ServiceError::NotFound(message),
        }
    }
}

impl From<SpotifyError> for ServiceError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::NotConfigured => {
                ServiceError::NotConfigured("spotify integration".into())
            }
            SpotifyError::InvalidTrackId(id) => {
                ServiceError::InvalidInput(format!("`{id}` is not a spotify track id"))
            }
            SpotifyError::TrackNotFound(id) => {
                ServiceError::NotFound(format!("track `{id}` not found"))
            }
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or invalid caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller not allowed to act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Upstream dependency failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
            ServiceError::NotConfigured(what) => {
                AppError::ServiceUnavailable(format!("{what} is not configured"))
            }
            ServiceError::Upstream(message) => AppError::BadGateway(message),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn status_of(err: LobbyError) -> StatusCode {
        AppError::from(ServiceError::from(err))
            .into_response()
            .status()
    }

    #[test]
    fn lobby_rule_violations_map_to_client_errors() {
        let song = Uuid::new_v4();
        assert_eq!(status_of(LobbyError::NotHost), StatusCode::FORBIDDEN);
        assert_eq!(status_of(LobbyError::SelfRating), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(LobbyError::DuplicateRating(song)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LobbyError::SongNotFound(song)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn spotify_failures_map_to_their_own_statuses() {
        let status = |err: SpotifyError| {
            AppError::from(ServiceError::from(err))
                .into_response()
                .status()
        };
        assert_eq!(
            status(SpotifyError::InvalidTrackId("../me".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(SpotifyError::NotConfigured), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status(SpotifyError::TrackNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let response = AppError::Unauthorized("missing user header".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn degraded_mode_is_service_unavailable() {
        let response = AppError::from(ServiceError::Degraded).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
