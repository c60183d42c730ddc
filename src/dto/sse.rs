use serde::Serialize;
use utoipa::ToSchema;

/// Event name carrying the shared game state.
pub const GAME_STATE_EVENT: &str = "game_state";
/// Event name carrying the session song list.
pub const SONGS_EVENT: &str = "songs";
/// Event name carrying the scoreboard.
pub const PLAYERS_EVENT: &str = "players";
/// Event name carrying [`SystemStatus`].
pub const SYSTEM_STATUS_EVENT: &str = "system_status";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` field; unnamed events use the default `message` type.
    pub event: Option<String>,
    /// Serialized JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// True while no document store is usable.
    pub degraded: bool,
}
