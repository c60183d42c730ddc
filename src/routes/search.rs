use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::search::{SearchQuery, SearchResult},
    error::PlainText,
    services::search_service,
    state::SharedState,
};

/// Search proxy endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/youtube-search", get(youtube_search))
}

#[utoipa::path(
    get,
    path = "/api/youtube-search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching videos", body = [SearchResult]),
        (status = 400, description = "Missing query"),
        (status = 429, description = "YouTube quota exceeded"),
        (status = 500, description = "API key missing or YouTube error")
    )
)]
/// Proxy a search to the YouTube Data API.
pub async fn youtube_search(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, PlainText> {
    Ok(Json(
        search_service::search(&state, query.q.as_deref()).await?,
    ))
}
