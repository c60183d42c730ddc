//! Shared playback document and its partial update.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::document::{DocumentData, fields, server_timestamp};

/// Phase of the shared playback document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// Idle, a song may or may not be loaded.
    #[default]
    Paused,
    /// A selection is in flight.
    Loading,
    /// Clients play a short excerpt from `seekTime`.
    PlayingSnippet,
    /// Clients keep playing past the snippet.
    PlayingMore,
    /// Title shown, playback continues.
    Revealed,
    /// Every song of the round was played.
    Finished,
    /// See `error` for the message.
    Error,
}

impl PlaybackPhase {
    /// Whether local players should be producing sound.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::PlayingSnippet | Self::PlayingMore)
    }
}

/// Singleton playback document stored at `sessions/{code}/state/current_game`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Id of the loaded song.
    #[serde(default)]
    pub current_song_id: Option<String>,
    /// URL clients load into their player.
    #[serde(default)]
    pub current_song_url: Option<String>,
    /// Title, hidden by clients until revealed.
    #[serde(default)]
    pub current_song_title: Option<String>,
    /// Current phase.
    #[serde(default)]
    pub playback_state: PlaybackPhase,
    /// Offset in seconds; only meaningful while playing.
    #[serde(default)]
    pub seek_time: f64,
    /// Set after the first snippet of the current song.
    #[serde(default)]
    pub snippet_played_once: bool,
    /// Songs already played in this round, in play order.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub played_song_ids: IndexSet<String>,
    /// Message of the last failure, cleared by the next selection.
    #[serde(default)]
    pub error: Option<String>,
    /// Commit time of the last write, epoch milliseconds.
    #[serde(default)]
    pub last_action_timestamp: Option<i64>,
}

impl GameState {
    /// Document written when a session is created.
    pub fn initial_update() -> GameStateUpdate {
        GameStateUpdate {
            current_song_id: Some(None),
            current_song_url: Some(None),
            current_song_title: Some(None),
            playback_state: Some(PlaybackPhase::Paused),
            seek_time: Some(0.0),
            snippet_played_once: Some(false),
            played_song_ids: Some(IndexSet::new()),
            error: Some(None),
        }
    }

    /// Whether a song is loaded.
    pub fn has_current_song(&self) -> bool {
        self.current_song_url.is_some()
    }
}

/// Partial write of [`GameState`]. Absent fields are left untouched by the merge;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdate {
    /// New song id; `null` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub current_song_id: Option<Option<String>>,
    /// New song URL; `null` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub current_song_url: Option<Option<String>>,
    /// New title; `null` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub current_song_title: Option<Option<String>>,
    /// New phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_state: Option<PlaybackPhase>,
    /// New offset in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seek_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet_played_once: Option<bool>,
    /// Replaces the whole played list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<String>>)]
    pub played_song_ids: Option<IndexSet<String>>,
    /// New error; `null` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub error: Option<Option<String>>,
}

impl GameStateUpdate {
    /// Update touching only the phase.
    pub fn phase(phase: PlaybackPhase) -> Self {
        Self {
            playback_state: Some(phase),
            ..Self::default()
        }
    }

    /// Move to the `error` phase with `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            playback_state: Some(PlaybackPhase::Error),
            error: Some(Some(message.into())),
            ..Self::default()
        }
    }

    /// Whether the update carries no field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field map for a merge write, stamped with the commit time.
    pub fn into_document(self) -> DocumentData {
        let mut data = serde_json::to_value(self).map(fields).unwrap_or_default();
        data.insert("lastActionTimestamp".to_owned(), server_timestamp());
        data
    }

    /// Apply the update locally, mirroring what the store merge does.
    pub fn apply_to(&self, state: &mut GameState) {
        if let Some(value) = &self.current_song_id {
            state.current_song_id = value.clone();
        }
        if let Some(value) = &self.current_song_url {
            state.current_song_url = value.clone();
        }
        if let Some(value) = &self.current_song_title {
            state.current_song_title = value.clone();
        }
        if let Some(value) = self.playback_state {
            state.playback_state = value;
        }
        if let Some(value) = self.seek_time {
            state.seek_time = value;
        }
        if let Some(value) = self.snippet_played_once {
            state.snippet_played_once = value;
        }
        if let Some(value) = &self.played_song_ids {
            state.played_song_ids = value.clone();
        }
        if let Some(value) = &self.error {
            state.error = value.clone();
        }
    }
}
