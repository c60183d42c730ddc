use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::player::PlayerView, playback::state::GameState};

#[derive(Debug, Serialize, ToSchema)]
/// Code of a freshly created session.
pub struct CreateSessionResponse {
    /// Six-digit session code.
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Confirmation that a session exists and can be joined.
pub struct JoinSessionResponse {
    /// Six-digit session code.
    pub code: String,
    /// RFC 3339 creation time, when the store recorded one.
    pub created_at: Option<String>,
}

impl JoinSessionResponse {
    /// Build the response from the stored epoch-millisecond creation time.
    pub fn new(code: String, created_at: i64) -> Self {
        Self {
            code,
            created_at: (created_at > 0).then(|| super::format_timestamp_millis(created_at)),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Playback document fields at the top level, next to the roster of the session.
pub struct GameSnapshot {
    /// Current playback document.
    #[serde(flatten)]
    pub state: GameState,
    /// Players of the session ordered by name.
    pub players: Vec<PlayerView>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::playback::state::PlaybackPhase;

    #[test]
    fn snapshot_flattens_the_game_state() {
        let snapshot = GameSnapshot {
            state: GameState {
                playback_state: PlaybackPhase::Revealed,
                current_song_title: Some("Song".into()),
                ..GameState::default()
            },
            players: vec![PlayerView {
                id: "p1".into(),
                name: "Alex".into(),
                score: 2,
            }],
        };
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["playbackState"], json!("revealed"));
        assert_eq!(value["currentSongTitle"], json!("Song"));
        assert_eq!(value["players"][0]["name"], json!("Alex"));
        assert!(value.get("state").is_none());
    }
}
