use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use validator::Validate;

use crate::{
    dto::player::{AddPlayerRequest, PlayerView, ScoreDeltaRequest},
    error::AppError,
    services::player_service,
    state::SharedState,
};

/// Player roster and score endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/sessions/{code}/players",
            get(list_players).post(add_player),
        )
        .route("/api/sessions/{code}/players/{id}", delete(delete_player))
        .route("/api/sessions/{code}/players/{id}/score", post(adjust_score))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{code}/players",
    tag = "players",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Players ordered by name", body = [PlayerView]))
)]
/// List the players of a session.
pub async fn list_players(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<PlayerView>>, AppError> {
    Ok(Json(player_service::list_players(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/players",
    tag = "players",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body = AddPlayerRequest,
    responses(
        (status = 201, description = "Player added", body = PlayerView),
        (status = 400, description = "Empty name"),
        (status = 409, description = "Name already used in this session")
    )
)]
/// Join a session as a new player.
pub async fn add_player(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<AddPlayerRequest>,
) -> Result<(StatusCode, Json<PlayerView>), AppError> {
    payload.validate()?;
    let player = player_service::add_player(&state, &code, payload).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{code}/players/{id}",
    tag = "players",
    params(
        ("code" = String, Path, description = "Six-digit session code"),
        ("id" = String, Path, description = "Player identifier")
    ),
    responses(
        (status = 204, description = "Player removed"),
        (status = 404, description = "Unknown session or player")
    )
)]
/// Remove a player.
pub async fn delete_player(
    State(state): State<SharedState>,
    Path((code, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    player_service::delete_player(&state, &code, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add `delta` to a player's score, never going below zero.
#[utoipa::path(
    post,
    path = "/api/sessions/{code}/players/{id}/score",
    tag = "players",
    params(
        ("code" = String, Path, description = "Six-digit session code"),
        ("id" = String, Path, description = "Player identifier")
    ),
    request_body = ScoreDeltaRequest,
    responses(
        (status = 200, description = "Updated player", body = PlayerView),
        (status = 404, description = "Unknown session or player")
    )
)]
/// Add a delta to a player's score, clamped at zero.
pub async fn adjust_score(
    State(state): State<SharedState>,
    Path((code, id)): Path<(String, String)>,
    Json(payload): Json<ScoreDeltaRequest>,
) -> Result<Json<PlayerView>, AppError> {
    Ok(Json(
        player_service::adjust_score(&state, &code, &id, payload).await?,
    ))
}
