//! Pure transition function of the shared playback document.

use indexmap::IndexSet;
use thiserror::Error;

use crate::playback::{
    state::{GameState, GameStateUpdate, PlaybackPhase},
    timing::PlaybackTiming,
};

/// Error shown when the snippet cannot fit the reported duration.
pub const SNIPPET_UNAVAILABLE: &str = "Cannot play snippet. Player not ready or video too short.";
/// Error shown when a selection finds an empty collection.
pub const NO_SONGS_ERROR: &str = "No songs added to this session.";
/// Title shown alongside [`NO_SONGS_ERROR`].
pub const NO_SONGS_TITLE: &str = "No songs available to play.";

/// Everything that can move the shared playback document.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// "Next song" pressed.
    SelectRequested,
    /// "Start game" pressed before any song was chosen.
    StartRequested,
    /// "Restart" pressed; forgets the played songs.
    RestartRequested,
    /// The selector picked a song; `played` already includes it.
    SongSelected {
        song_id: String,
        url: String,
        title: String,
        played: IndexSet<String>,
    },
    /// Every song was played; `message` ends the round.
    AllPlayed {
        message: String,
    },
    NoSongs {
        played: IndexSet<String>,
    },
    /// Reading the collection or the song failed.
    SelectionFailed {
        reason: String,
    },
    /// `fraction` is a uniform sample in `[0, 1)` used for the seek offset.
    PlaySnippet {
        duration: f64,
        fraction: f64,
    },
    /// Resume from `position` until the end of the media.
    PlayMore {
        position: f64,
        duration: f64,
    },
    /// Local stop countdown expired.
    SnippetElapsed,
    /// The media reached its end.
    MediaEnded,
    Pause,
    /// Show the title and keep playing.
    Reveal,
    /// A client media player reported an error.
    PlayerFailed {
        message: String,
    },
}

/// Outcome of a valid event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Write this partial update.
    Apply(GameStateUpdate),
    /// Request is a no-op in the current state.
    Ignore,
}

/// Event not accepted in the current phase.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid playback transition from {from:?} on {event:?}")]
pub struct InvalidTransition {
    /// Phase the document was in.
    pub from: PlaybackPhase,
    /// Rejected event.
    pub event: PlaybackEvent,
}

fn begin_selection(played: Option<IndexSet<String>>) -> GameStateUpdate {
    GameStateUpdate {
        playback_state: Some(PlaybackPhase::Loading),
        error: Some(None),
        snippet_played_once: Some(false),
        played_song_ids: played,
        ..GameStateUpdate::default()
    }
}

fn cleared_song(title: Option<String>) -> GameStateUpdate {
    GameStateUpdate {
        current_song_id: Some(None),
        current_song_url: Some(None),
        current_song_title: Some(title),
        ..GameStateUpdate::default()
    }
}

/// Compute the update `event` produces from `state`.
///
/// User requests that do not apply are [`Transition::Ignore`]; selection outcomes
/// arriving outside `loading` are [`InvalidTransition`].
pub fn transition(
    state: &GameState,
    event: PlaybackEvent,
    timing: &PlaybackTiming,
) -> Result<Transition, InvalidTransition> {
    use PlaybackPhase as P;

    let phase = state.playback_state;
    let update = match event {
        PlaybackEvent::SelectRequested => match phase {
            P::Loading | P::Finished => return Ok(Transition::Ignore),
            _ => begin_selection(None),
        },
        PlaybackEvent::StartRequested => {
            if phase != P::Paused || state.has_current_song() {
                return Ok(Transition::Ignore);
            }
            begin_selection(None)
        }
        PlaybackEvent::RestartRequested => match phase {
            P::Loading => return Ok(Transition::Ignore),
            _ => begin_selection(Some(IndexSet::new())),
        },
        PlaybackEvent::SongSelected {
            song_id,
            url,
            title,
            played,
        } if phase == P::Loading => GameStateUpdate {
            current_song_id: Some(Some(song_id)),
            current_song_url: Some(Some(url)),
            current_song_title: Some(Some(title)),
            playback_state: Some(P::Paused),
            seek_time: Some(0.0),
            snippet_played_once: Some(false),
            played_song_ids: Some(played),
            error: Some(None),
        },
        PlaybackEvent::AllPlayed { message } if phase == P::Loading => GameStateUpdate {
            playback_state: Some(P::Finished),
            error: Some(None),
            ..cleared_song(Some(message))
        },
        PlaybackEvent::NoSongs { played } if phase == P::Loading => GameStateUpdate {
            playback_state: Some(P::Error),
            error: Some(Some(NO_SONGS_ERROR.to_owned())),
            played_song_ids: Some(played),
            ..cleared_song(Some(NO_SONGS_TITLE.to_owned()))
        },
        PlaybackEvent::SelectionFailed { reason } if phase == P::Loading => {
            GameStateUpdate::failure(format!("Failed to select next song: {reason}"))
        }
        event @ (PlaybackEvent::SongSelected { .. }
        | PlaybackEvent::AllPlayed { .. }
        | PlaybackEvent::NoSongs { .. }
        | PlaybackEvent::SelectionFailed { .. }) => {
            return Err(InvalidTransition { from: phase, event });
        }
        PlaybackEvent::PlaySnippet { duration, fraction } => {
            if phase != P::Paused || !state.has_current_song() || state.snippet_played_once {
                return Ok(Transition::Ignore);
            }
            if !timing.fits_snippet(duration) {
                GameStateUpdate::failure(SNIPPET_UNAVAILABLE)
            } else {
                GameStateUpdate {
                    playback_state: Some(P::PlayingSnippet),
                    seek_time: Some(timing.snippet_seek_offset(duration, fraction)),
                    snippet_played_once: Some(true),
                    error: Some(None),
                    ..GameStateUpdate::default()
                }
            }
        }
        PlaybackEvent::PlayMore { position, duration } => {
            if phase != P::Paused
                || !state.has_current_song()
                || !state.snippet_played_once
                || !timing.can_play_more(position, duration)
            {
                return Ok(Transition::Ignore);
            }
            GameStateUpdate {
                playback_state: Some(P::PlayingMore),
                seek_time: Some(position),
                error: Some(None),
                ..GameStateUpdate::default()
            }
        }
        PlaybackEvent::SnippetElapsed | PlaybackEvent::MediaEnded | PlaybackEvent::Pause => {
            if !phase.is_playing() {
                return Ok(Transition::Ignore);
            }
            GameStateUpdate::phase(P::Paused)
        }
        PlaybackEvent::Reveal => {
            if matches!(phase, P::Loading | P::Revealed) || !state.has_current_song() {
                return Ok(Transition::Ignore);
            }
            GameStateUpdate::phase(P::Revealed)
        }
        PlaybackEvent::PlayerFailed { message } => GameStateUpdate::failure(message),
    };

    Ok(Transition::Apply(update))
}
