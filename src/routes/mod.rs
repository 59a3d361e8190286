use axum::{Router, middleware};

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod identity;
pub mod lobby;
pub mod songs;
pub mod spotify;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let user_router = lobby::router()
        .merge(songs::router())
        .merge(sse::router())
        .route_layer(middleware::from_fn(identity::require_user));

    let api_router = health::router()
        .merge(spotify::router())
        .merge(user_router);

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
