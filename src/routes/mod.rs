use axum::Router;

use crate::state::SharedState;

/// Swagger UI.
pub mod docs;
/// Liveness endpoint.
pub mod health;
/// Shared playback requests.
pub mod playback;
/// Scoreboard of a session.
pub mod players;
/// YouTube search proxy.
pub mod search;
/// Session creation, join and snapshot.
pub mod sessions;
/// Session songs and the global library.
pub mod songs;
/// Session event stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = Router::<SharedState>::new()
        .merge(sessions::router())
        .merge(songs::router())
        .merge(players::router())
        .merge(playback::router())
        .merge(search::router())
        .merge(sse::router());

    health::router()
        .merge(api_router)
        .merge(docs::router())
        .with_state(state)
}
