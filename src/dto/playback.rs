use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::playback::{coordinator::PlaybackOutcome, state::GameState};

/// Body of the next-song request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextSongRequest {
    /// Ignore the played list and pick from every song.
    #[serde(default)]
    pub force_reset_played_ids: bool,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
/// Local duration reported by the client asking for a snippet.
pub struct SnippetRequest {
    /// Media duration in seconds as seen by the client player.
    #[validate(range(min = 0.0))]
    pub duration: f64,
}

/// Resume request: where the client player stands and how long the media is.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayMoreRequest {
    /// Current position in seconds.
    #[validate(range(min = 0.0))]
    pub position: f64,
    /// Media duration in seconds.
    #[validate(range(min = 0.0))]
    pub duration: f64,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
/// Failure raised by a client's media player.
pub struct PlayerErrorRequest {
    /// Message shown to every client.
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Result of a playback request: whether it changed anything, and the state afterwards.
pub struct PlaybackResponse {
    /// Whether the request changed the shared state.
    pub applied: bool,
    /// Shared state after the request.
    pub state: GameState,
    /// Set by the start and restart endpoints: the caller should request the first snippet once ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_first_snippet: Option<bool>,
}

impl PlaybackResponse {
    /// Song a client should arm autoplay for, when the server asked for a first snippet.
    pub fn first_snippet_url(&self) -> Option<&str> {
        match self.play_first_snippet {
            Some(true) => self.state.current_song_url.as_deref(),
            _ => None,
        }
    }
}

impl From<PlaybackOutcome> for PlaybackResponse {
    fn from(outcome: PlaybackOutcome) -> Self {
        Self {
            applied: outcome.applied,
            state: outcome.state,
            play_first_snippet: None,
        }
    }
}
