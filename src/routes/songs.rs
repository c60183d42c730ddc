use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use validator::Validate;

use crate::{
    dto::song::{AddSongRequest, AddSongResponse, SongView},
    error::{AppError, PlainText},
    services::song_service,
    state::SharedState,
};

/// Song endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/sessions/{code}/songs",
            get(list_session_songs).post(add_session_song),
        )
        .route("/api/sessions/{code}/songs/{id}", delete(delete_session_song))
        .route("/api/songs", get(list_library))
        .route("/api/add-song", post(add_song))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{code}/songs",
    tag = "songs",
    params(("code" = String, Path, description = "Six-digit session code")),
    responses((status = 200, description = "Session songs, newest first", body = [SongView]))
)]
/// List the songs of a session.
pub async fn list_session_songs(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<SongView>>, AppError> {
    Ok(Json(song_service::list_session_songs(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{code}/songs",
    tag = "songs",
    params(("code" = String, Path, description = "Six-digit session code")),
    request_body = AddSongRequest,
    responses(
        (status = 201, description = "Song added", body = AddSongResponse),
        (status = 400, description = "Missing title or invalid URL"),
        (status = 409, description = "URL already in the session")
    )
)]
/// Add a song to a session.
pub async fn add_session_song(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<AddSongRequest>,
) -> Result<(StatusCode, Json<AddSongResponse>), AppError> {
    payload.validate()?;
    let added = song_service::add_session_song(&state, &code, payload).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// Delete a song; deleting the current song selects the next one.
#[utoipa::path(
    delete,
    path = "/api/sessions/{code}/songs/{id}",
    tag = "songs",
    params(
        ("code" = String, Path, description = "Six-digit session code"),
        ("id" = String, Path, description = "Song identifier")
    ),
    responses(
        (status = 204, description = "Song deleted"),
        (status = 404, description = "Unknown session or song")
    )
)]
/// Remove a song from a session.
pub async fn delete_session_song(
    State(state): State<SharedState>,
    Path((code, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    song_service::delete_session_song(&state, &code, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/songs",
    tag = "songs",
    responses((status = 200, description = "Global song library, newest first", body = [SongView]))
)]
/// List the global library.
pub async fn list_library(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SongView>>, AppError> {
    Ok(Json(song_service::list_library(&state).await?))
}

/// Add a song to `sessionCode`, or to the global library when it is absent.
#[utoipa::path(
    post,
    path = "/api/add-song",
    tag = "songs",
    request_body = AddSongRequest,
    responses(
        (status = 201, description = "Song added", body = AddSongResponse),
        (status = 400, description = "Missing title or invalid URL"),
        (status = 409, description = "Song with this URL already exists")
    )
)]
/// Add a song to a session or, without `sessionCode`, to the library.
pub async fn add_song(
    State(state): State<SharedState>,
    Json(payload): Json<AddSongRequest>,
) -> Result<(StatusCode, Json<AddSongResponse>), PlainText> {
    payload.validate()?;
    let added = song_service::add_song(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(added)))
}
