use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::session::{CreateSessionResponse, GameSnapshot, JoinSessionResponse},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Session endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{code}/join", post(join_session))
        .route("/api/game/{code}", get(game_snapshot))
}

/// Create a session with a fresh six-digit code.
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Create a session under a fresh six-digit code.
pub async fn create_session(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let created = session_service::create_session(&state).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/join",
    tag = "sessions",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses(
        (status = 200, description = "Session exists", body = JoinSessionResponse),
        (status = 400, description = "Malformed code"),
        (status = 404, description = "Unknown session")
    )
)]
/// Check that a session exists.
pub async fn join_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<JoinSessionResponse>, AppError> {
    Ok(Json(session_service::join_session(&state, &code).await?))
}

/// Current playback document together with the players.
#[utoipa::path(
    get,
    path = "/api/game/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses(
        (status = 200, description = "Game snapshot", body = GameSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
/// Playback state and players of a session in one body.
pub async fn game_snapshot(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(session_service::snapshot(&state, &code).await?))
}
