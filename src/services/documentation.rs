use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Song Guess Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::create_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::game_snapshot,
        crate::routes::sse::session_events,
        crate::routes::songs::list_session_songs,
        crate::routes::songs::add_session_song,
        crate::routes::songs::delete_session_song,
        crate::routes::songs::list_library,
        crate::routes::songs::add_song,
        crate::routes::players::list_players,
        crate::routes::players::add_player,
        crate::routes::players::delete_player,
        crate::routes::players::adjust_score,
        crate::routes::search::youtube_search,
        crate::routes::playback::update_state,
        crate::routes::playback::next_song,
        crate::routes::playback::play_snippet,
        crate::routes::playback::play_more,
        crate::routes::playback::reveal,
        crate::routes::playback::pause,
        crate::routes::playback::snippet_elapsed,
        crate::routes::playback::media_ended,
        crate::routes::playback::player_error,
        crate::routes::playback::start,
        crate::routes::playback::restart,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionResponse,
            crate::dto::session::JoinSessionResponse,
            crate::dto::session::GameSnapshot,
            crate::dto::song::SongView,
            crate::dto::song::AddSongRequest,
            crate::dto::song::AddSongResponse,
            crate::dto::player::PlayerView,
            crate::dto::player::AddPlayerRequest,
            crate::dto::player::ScoreDeltaRequest,
            crate::dto::search::SearchResult,
            crate::dto::playback::NextSongRequest,
            crate::dto::playback::SnippetRequest,
            crate::dto::playback::PlayMoreRequest,
            crate::dto::playback::PlayerErrorRequest,
            crate::dto::playback::PlaybackResponse,
            crate::dto::sse::SystemStatus,
            crate::playback::state::GameState,
            crate::playback::state::GameStateUpdate,
            crate::playback::state::PlaybackPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session creation and lookup"),
        (name = "songs", description = "Session songs and the global library"),
        (name = "players", description = "Session roster and scores"),
        (name = "search", description = "YouTube search proxy"),
        (name = "playback", description = "Shared playback state transitions"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
