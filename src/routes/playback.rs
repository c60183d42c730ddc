use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{patch, post},
};
use validator::Validate;

use crate::{
    dto::playback::{
        NextSongRequest, PlayMoreRequest, PlaybackResponse, PlayerErrorRequest, SnippetRequest,
    },
    error::AppError,
    playback::state::GameStateUpdate,
    services::playback_service,
    state::SharedState,
};

type PlaybackResult = Result<Json<PlaybackResponse>, AppError>;

/// Playback requests; each answers with whether it applied and the resulting state.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/sessions/{code}/state", patch(update_state))
        .route("/api/sessions/{code}/playback/next", post(next_song))
        .route("/api/sessions/{code}/playback/snippet", post(play_snippet))
        .route("/api/sessions/{code}/playback/more", post(play_more))
        .route("/api/sessions/{code}/playback/reveal", post(reveal))
        .route("/api/sessions/{code}/playback/pause", post(pause))
        .route("/api/sessions/{code}/playback/elapsed", post(snippet_elapsed))
        .route("/api/sessions/{code}/playback/ended", post(media_ended))
        .route("/api/sessions/{code}/playback/error", post(player_error))
        .route("/api/sessions/{code}/playback/start", post(start))
        .route("/api/sessions/{code}/playback/restart", post(restart))
}

/// Merge a partial state without transition checks.
#[utoipa::path(
    patch,
    path = "/api/sessions/{code}/state",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body = GameStateUpdate,
    responses(
        (status = 200, description = "State after the write", body = PlaybackResponse),
        (status = 400, description = "Empty update")
    )
)]
/// Merge a raw partial update into the shared state.
pub async fn update_state(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(update): Json<GameStateUpdate>,
) -> PlaybackResult {
    Ok(Json(playback_service::update_state(&state, &code, update).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/next",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body(content = NextSongRequest, description = "Optional; `forceResetPlayedIds` defaults to false"),
    responses((status = 200, description = "Selection outcome", body = PlaybackResponse))
)]
/// Select another song of the session.
pub async fn next_song(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    payload: Option<Json<NextSongRequest>>,
) -> PlaybackResult {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    Ok(Json(playback_service::next_song(&state, &code, request).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/snippet",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body = SnippetRequest,
    responses((status = 200, description = "Snippet started, failed or ignored", body = PlaybackResponse))
)]
/// Start a snippet at a random offset.
pub async fn play_snippet(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<SnippetRequest>,
) -> PlaybackResult {
    payload.validate()?;
    Ok(Json(playback_service::play_snippet(&state, &code, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/more",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body = PlayMoreRequest,
    responses((status = 200, description = "Playback continued or ignored", body = PlaybackResponse))
)]
/// Resume playback from the client position.
pub async fn play_more(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<PlayMoreRequest>,
) -> PlaybackResult {
    payload.validate()?;
    Ok(Json(playback_service::play_more(&state, &code, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/reveal",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Title revealed or ignored", body = PlaybackResponse))
)]
/// Reveal the current title.
pub async fn reveal(State(state): State<SharedState>, Path(code): Path<String>) -> PlaybackResult {
    Ok(Json(playback_service::reveal(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/pause",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Paused or ignored", body = PlaybackResponse))
)]
/// Pause every player.
pub async fn pause(State(state): State<SharedState>, Path(code): Path<String>) -> PlaybackResult {
    Ok(Json(playback_service::pause(&state, &code).await?))
}

/// Sent by a client whose stop countdown expired.
#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/elapsed",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Paused or ignored", body = PlaybackResponse))
)]
/// Snippet countdown expired on a client.
pub async fn snippet_elapsed(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> PlaybackResult {
    Ok(Json(playback_service::snippet_elapsed(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/ended",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Paused or ignored", body = PlaybackResponse))
)]
/// The media reached its end on a client.
pub async fn media_ended(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> PlaybackResult {
    Ok(Json(playback_service::media_ended(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/error",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body = PlayerErrorRequest,
    responses((status = 200, description = "Error recorded", body = PlaybackResponse))
)]
/// Record a client player failure.
pub async fn player_error(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<PlayerErrorRequest>,
) -> PlaybackResult {
    payload.validate()?;
    Ok(Json(playback_service::player_error(&state, &code, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/start",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "First song selected; `playFirstSnippet` is set", body = PlaybackResponse))
)]
/// Start the game with a first selection.
pub async fn start(State(state): State<SharedState>, Path(code): Path<String>) -> PlaybackResult {
    Ok(Json(playback_service::start(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/playback/restart",
    tag = "playback",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Played list cleared and a song selected; `playFirstSnippet` is set", body = PlaybackResponse))
)]
/// Forget the played songs and select again.
pub async fn restart(State(state): State<SharedState>, Path(code): Path<String>) -> PlaybackResult {
    Ok(Json(playback_service::restart(&state, &code).await?))
}
