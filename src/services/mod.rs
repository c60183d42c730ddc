/// OpenAPI document.
pub mod documentation;
/// Store health reporting.
pub mod health_service;
/// Playback requests on top of the coordinator.
pub mod playback_service;
/// Player roster and scores.
pub mod player_service;
/// YouTube Data API proxy.
pub mod search_service;
/// Session lifecycle.
pub mod session_service;
/// Session songs and the library.
pub mod song_service;
/// Event stream assembly.
pub mod sse_service;
/// Background health checks and reconnection of the store.
pub mod storage_supervisor;
