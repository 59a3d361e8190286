use axum::{body::Body, http::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::AppError;

/// Header set by the upstream auth proxy with the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller, inserted into request extensions by [`require_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

/// Reject requests without a well-formed `X-User-Id` header.
pub async fn require_user(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("missing user header `X-User-Id`".into()))?
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("`X-User-Id` must be a UUID".into()))?;

    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}
