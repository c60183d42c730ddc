//! Server-side driver of the shared playback document.

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::{
    dao::{document::CollectionPath, repository::SessionRepository},
    error::ServiceError,
    playback::{
        gateway::GameStateGateway,
        machine::{PlaybackEvent, Transition, transition},
        selector::{Selection, select_next},
        state::{GameState, GameStateUpdate},
        timing::PlaybackTiming,
    },
};

/// Result of a playback request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOutcome {
    /// False when the request was a no-op in the current state.
    pub applied: bool,
    /// Shared state after the request.
    pub state: GameState,
}

impl PlaybackOutcome {
    fn applied(state: GameState) -> Self {
        Self {
            applied: true,
            state,
        }
    }

    fn ignored(state: GameState) -> Self {
        Self {
            applied: false,
            state,
        }
    }
}

/// Applies [`PlaybackEvent`]s of one session through the pure transition function.
pub struct PlaybackCoordinator {
    gateway: GameStateGateway,
    repository: SessionRepository,
    songs: CollectionPath,
    timing: PlaybackTiming,
    end_of_round_message: String,
}

impl PlaybackCoordinator {
    /// Coordinator for the session `gateway` writes to.
    pub fn new(
        gateway: GameStateGateway,
        repository: SessionRepository,
        timing: PlaybackTiming,
        end_of_round_message: impl Into<String>,
    ) -> Self {
        let songs = CollectionPath::session_songs(gateway.code());
        Self {
            gateway,
            repository,
            songs,
            timing,
            end_of_round_message: end_of_round_message.into(),
        }
    }

    /// Shared state as stored, or the initial state for a fresh session.
    pub async fn current_state(&self) -> Result<GameState, ServiceError> {
        Ok(self.gateway.load().await?)
    }

    /// Raw partial write, bypassing the transition rules.
    pub async fn request_state_update(
        &self,
        update: GameStateUpdate,
    ) -> Result<PlaybackOutcome, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::InvalidInput("State update has no fields".into()));
        }
        Ok(PlaybackOutcome::applied(self.gateway.publish(update).await?))
    }

    /// Move on to another unplayed song.
    pub async fn request_next_song(&self, force_reset: bool) -> Result<PlaybackOutcome, ServiceError> {
        self.select(PlaybackEvent::SelectRequested, force_reset).await
    }

    /// First selection of a session; the caller should request a snippet once its player is ready.
    pub async fn request_start_game(&self) -> Result<PlaybackOutcome, ServiceError> {
        self.select(PlaybackEvent::StartRequested, false).await
    }

    /// Forget the played songs and select again from the whole session.
    pub async fn request_restart_game(&self) -> Result<PlaybackOutcome, ServiceError> {
        self.select(PlaybackEvent::RestartRequested, true).await
    }

    /// Seek to a random offset that leaves room for a full snippet of `duration`.
    pub async fn request_play_snippet(&self, duration: f64) -> Result<PlaybackOutcome, ServiceError> {
        let fraction = rand::random::<f64>();
        self.dispatch(PlaybackEvent::PlaySnippet { duration, fraction })
            .await
    }

    /// Keep playing from `position`.
    pub async fn request_play_more(
        &self,
        position: f64,
        duration: f64,
    ) -> Result<PlaybackOutcome, ServiceError> {
        self.dispatch(PlaybackEvent::PlayMore { position, duration })
            .await
    }

    /// Show the current title.
    pub async fn request_reveal(&self) -> Result<PlaybackOutcome, ServiceError> {
        self.dispatch(PlaybackEvent::Reveal).await
    }

    /// Stop every player where it is.
    pub async fn request_pause(&self) -> Result<PlaybackOutcome, ServiceError> {
        self.dispatch(PlaybackEvent::Pause).await
    }

    /// The local snippet countdown reached zero.
    pub async fn report_elapsed(&self) -> Result<PlaybackOutcome, ServiceError> {
        self.dispatch(PlaybackEvent::SnippetElapsed).await
    }

    /// The media finished on a client.
    pub async fn report_media_ended(&self) -> Result<PlaybackOutcome, ServiceError> {
        self.dispatch(PlaybackEvent::MediaEnded).await
    }

    /// Record a player failure as the session error.
    pub async fn report_player_error(
        &self,
        message: impl Into<String>,
    ) -> Result<PlaybackOutcome, ServiceError> {
        self.dispatch(PlaybackEvent::PlayerFailed {
            message: message.into(),
        })
        .await
    }

    async fn dispatch(&self, event: PlaybackEvent) -> Result<PlaybackOutcome, ServiceError> {
        let state = self.gateway.load().await?;
        self.dispatch_from(state, event).await
    }

    async fn dispatch_from(
        &self,
        state: GameState,
        event: PlaybackEvent,
    ) -> Result<PlaybackOutcome, ServiceError> {
        match transition(&state, event, &self.timing) {
            Ok(Transition::Apply(update)) => {
                Ok(PlaybackOutcome::applied(self.gateway.publish(update).await?))
            }
            Ok(Transition::Ignore) => {
                debug!(code = %self.gateway.code(), phase = ?state.playback_state, "playback request ignored");
                Ok(PlaybackOutcome::ignored(state))
            }
            Err(invalid) => {
                warn!(code = %self.gateway.code(), error = %invalid, "rejected playback transition");
                Ok(PlaybackOutcome::ignored(state))
            }
        }
    }

    /// Publish `loading`, then resolve and publish the selection outcome.
    async fn select(
        &self,
        trigger: PlaybackEvent,
        force_reset: bool,
    ) -> Result<PlaybackOutcome, ServiceError> {
        let current = self.gateway.load().await?;
        let started = self.dispatch_from(current, trigger).await?;
        if !started.applied {
            return Ok(started);
        }

        let loading = started.state;
        let outcome = self.resolve_selection(&loading, force_reset).await;
        let result = match self.dispatch_from(loading, outcome).await {
            Ok(result) => result,
            Err(err) => {
                self.leave_loading(&err).await;
                return Err(err);
            }
        };
        info!(
            code = %self.gateway.code(),
            phase = ?result.state.playback_state,
            song = result.state.current_song_id.as_deref().unwrap_or("-"),
            played = result.state.played_song_ids.len(),
            "song selection finished"
        );
        Ok(result)
    }

    /// Best-effort move out of `loading` after the outcome write failed.
    async fn leave_loading(&self, err: &ServiceError) {
        let update = GameStateUpdate::failure(format!("Failed to select next song: {err}"));
        if let Err(write_err) = self.gateway.publish(update).await {
            warn!(
                code = %self.gateway.code(),
                error = %write_err,
                "could not record failed song selection"
            );
        }
    }

    async fn resolve_selection(&self, loading: &GameState, force_reset: bool) -> PlaybackEvent {
        let song_ids = match self.repository.song_ids(&self.songs).await {
            Ok(ids) => ids,
            Err(err) => {
                return PlaybackEvent::SelectionFailed {
                    reason: err.to_string(),
                };
            }
        };

        let selection = select_next(
            &song_ids,
            &loading.played_song_ids,
            force_reset,
            &mut rand::rng(),
        );
        let mut played = if force_reset {
            IndexSet::new()
        } else {
            loading.played_song_ids.clone()
        };

        match selection {
            Selection::NoSongsAtAll => PlaybackEvent::NoSongs { played },
            Selection::AllPlayed => PlaybackEvent::AllPlayed {
                message: self.end_of_round_message.clone(),
            },
            Selection::Selected(id) => match self.repository.find_song(&self.songs, &id).await {
                Ok(Some(song)) => {
                    played.insert(id.clone());
                    PlaybackEvent::SongSelected {
                        song_id: id,
                        url: song.url,
                        title: song.title,
                        played,
                    }
                }
                Ok(None) => PlaybackEvent::SelectionFailed {
                    reason: format!("song {id} not found"),
                },
                Err(err) => PlaybackEvent::SelectionFailed {
                    reason: err.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        io,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::{
            document::{DocPath, Document, DocumentData, Query, WriteMode},
            document_store::{DocumentStore, memory::MemoryDocumentStore},
            storage::{StorageError, StorageResult},
        },
        playback::{
            machine::{NO_SONGS_ERROR, NO_SONGS_TITLE, SNIPPET_UNAVAILABLE},
            state::PlaybackPhase,
        },
        state::SseHub,
    };

    const CODE: &str = "123456";

    async fn coordinator(song_titles: &[&str]) -> (PlaybackCoordinator, SessionRepository) {
        let store = Arc::new(MemoryDocumentStore::new());
        let repository = SessionRepository::new(store.clone());
        repository.create_session(CODE).await.unwrap();
        let songs = CollectionPath::session_songs(CODE);
        for (index, title) in song_titles.iter().enumerate() {
            repository
                .insert_song(&songs, title, &format!("https://www.youtube.com/watch?v={index}"))
                .await
                .unwrap();
        }
        let gateway = GameStateGateway::new(store, Arc::new(SseHub::new(64)), CODE);
        let coordinator = PlaybackCoordinator::new(
            gateway,
            repository.clone(),
            PlaybackTiming::default(),
            "All songs played!",
        );
        (coordinator, repository)
    }

    #[tokio::test]
    async fn plays_every_song_once_then_finishes() {
        let (coordinator, _) = coordinator(&["A", "B", "C"]).await;
        let mut seen = HashSet::new();

        let started = coordinator.request_start_game().await.unwrap();
        assert!(started.applied);
        seen.insert(started.state.current_song_id.clone().unwrap());

        for _ in 0..2 {
            let next = coordinator.request_next_song(false).await.unwrap();
            assert_eq!(next.state.playback_state, PlaybackPhase::Paused);
            assert!(seen.insert(next.state.current_song_id.clone().unwrap()));
        }

        let done = coordinator.request_next_song(false).await.unwrap();
        assert_eq!(done.state.playback_state, PlaybackPhase::Finished);
        assert_eq!(done.state.current_song_id, None);
        assert_eq!(done.state.current_song_title.as_deref(), Some("All songs played!"));
        assert_eq!(done.state.played_song_ids.len(), 3);

        let ignored = coordinator.request_next_song(false).await.unwrap();
        assert!(!ignored.applied);
    }

    #[tokio::test]
    async fn restart_clears_played_songs() {
        let (coordinator, _) = coordinator(&["A", "B"]).await;
        coordinator.request_next_song(false).await.unwrap();
        coordinator.request_next_song(false).await.unwrap();
        coordinator.request_next_song(false).await.unwrap();

        let restarted = coordinator.request_restart_game().await.unwrap();
        assert_eq!(restarted.state.playback_state, PlaybackPhase::Paused);
        assert_eq!(restarted.state.played_song_ids.len(), 1);
        assert!(restarted.state.has_current_song());
    }

    #[tokio::test]
    async fn force_reset_keeps_only_the_new_song() {
        let (coordinator, _) = coordinator(&["A", "B", "C"]).await;
        coordinator.request_next_song(false).await.unwrap();
        coordinator.request_next_song(false).await.unwrap();

        let reset = coordinator.request_next_song(true).await.unwrap();
        let current = reset.state.current_song_id.clone().unwrap();
        assert_eq!(reset.state.played_song_ids.iter().collect::<Vec<_>>(), [&current]);
    }

    #[tokio::test]
    async fn empty_session_reports_an_error() {
        let (coordinator, _) = coordinator(&[]).await;
        let outcome = coordinator.request_next_song(false).await.unwrap();

        assert_eq!(outcome.state.playback_state, PlaybackPhase::Error);
        assert_eq!(outcome.state.error.as_deref(), Some(NO_SONGS_ERROR));
        assert_eq!(outcome.state.current_song_title.as_deref(), Some(NO_SONGS_TITLE));
    }

    #[tokio::test]
    async fn snippet_then_elapsed_then_more() {
        let (coordinator, _) = coordinator(&["A"]).await;
        coordinator.request_next_song(false).await.unwrap();

        let snippet = coordinator.request_play_snippet(200.0).await.unwrap();
        assert_eq!(snippet.state.playback_state, PlaybackPhase::PlayingSnippet);
        assert!(snippet.state.seek_time >= 0.0 && snippet.state.seek_time <= 150.0);
        assert!(snippet.state.snippet_played_once);

        assert!(!coordinator.request_play_more(20.0, 200.0).await.unwrap().applied);
        assert!(coordinator.report_elapsed().await.unwrap().applied);
        assert!(!coordinator.request_play_snippet(200.0).await.unwrap().applied);

        let more = coordinator.request_play_more(20.0, 200.0).await.unwrap();
        assert_eq!(more.state.playback_state, PlaybackPhase::PlayingMore);
        assert_eq!(more.state.seek_time, 20.0);

        let ended = coordinator.report_media_ended().await.unwrap();
        assert_eq!(ended.state.playback_state, PlaybackPhase::Paused);
        let revealed = coordinator.request_reveal().await.unwrap();
        assert_eq!(revealed.state.playback_state, PlaybackPhase::Revealed);
    }

    #[tokio::test]
    async fn short_track_fails_the_snippet() {
        let (coordinator, _) = coordinator(&["A"]).await;
        coordinator.request_next_song(false).await.unwrap();

        let outcome = coordinator.request_play_snippet(5.0).await.unwrap();
        assert_eq!(outcome.state.playback_state, PlaybackPhase::Error);
        assert_eq!(outcome.state.error.as_deref(), Some(SNIPPET_UNAVAILABLE));
    }

    #[tokio::test]
    async fn player_errors_are_persisted() {
        let (coordinator, _) = coordinator(&["A"]).await;
        let outcome = coordinator
            .report_player_error("Player error: 150")
            .await
            .unwrap();
        assert_eq!(outcome.state.error.as_deref(), Some("Player error: 150"));

        let recovered = coordinator.request_next_song(false).await.unwrap();
        assert_eq!(recovered.state.playback_state, PlaybackPhase::Paused);
        assert_eq!(recovered.state.error, None);
    }

    /// Memory store that can hide song documents or reject one game-state write.
    struct FaultyStore {
        inner: MemoryDocumentStore,
        state_writes: AtomicUsize,
        fail_state_write: Option<usize>,
        hide_songs: bool,
    }

    impl DocumentStore for FaultyStore {
        fn get(&self, path: DocPath) -> BoxFuture<'static, StorageResult<Option<Document>>> {
            if self.hide_songs && CollectionPath::session_songs(CODE).contains(&path) {
                return Box::pin(async { Ok(None) });
            }
            self.inner.get(path)
        }

        fn set(
            &self,
            path: DocPath,
            data: DocumentData,
            mode: WriteMode,
        ) -> BoxFuture<'static, StorageResult<Document>> {
            if path == DocPath::game_state(CODE) {
                let index = self.state_writes.fetch_add(1, Ordering::SeqCst) + 1;
                if Some(index) == self.fail_state_write {
                    return Box::pin(async {
                        Err(StorageError::unavailable(
                            "write rejected".into(),
                            io::Error::other("write rejected"),
                        ))
                    });
                }
            }
            self.inner.set(path, data, mode)
        }

        fn delete(&self, path: DocPath) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete(path)
        }

        fn query(
            &self,
            collection: CollectionPath,
            query: Query,
        ) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
            self.inner.query(collection, query)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    async fn faulty_coordinator(
        fail_state_write: Option<usize>,
        hide_songs: bool,
    ) -> PlaybackCoordinator {
        let inner = MemoryDocumentStore::new();
        let seeding = SessionRepository::new(Arc::new(inner.clone()));
        seeding.create_session(CODE).await.unwrap();
        seeding
            .insert_song(
                &CollectionPath::session_songs(CODE),
                "A",
                "https://www.youtube.com/watch?v=a",
            )
            .await
            .unwrap();

        let store: Arc<dyn DocumentStore> = Arc::new(FaultyStore {
            inner,
            state_writes: AtomicUsize::new(0),
            fail_state_write,
            hide_songs,
        });
        let gateway = GameStateGateway::new(store.clone(), Arc::new(SseHub::new(64)), CODE);
        PlaybackCoordinator::new(
            gateway,
            SessionRepository::new(store),
            PlaybackTiming::default(),
            "All songs played!",
        )
    }

    #[tokio::test]
    async fn failed_outcome_write_does_not_leave_the_session_loading() {
        // Write 1 publishes `loading`, write 2 the selected song.
        let coordinator = faulty_coordinator(Some(2), false).await;

        assert!(coordinator.request_next_song(false).await.is_err());
        let state = coordinator.current_state().await.unwrap();
        assert_eq!(state.playback_state, PlaybackPhase::Error);
        assert!(
            state
                .error
                .as_deref()
                .is_some_and(|message| message.starts_with("Failed to select next song"))
        );

        let retried = coordinator.request_next_song(false).await.unwrap();
        assert!(retried.applied);
        assert_eq!(retried.state.playback_state, PlaybackPhase::Paused);
        assert!(retried.state.has_current_song());
    }

    #[tokio::test]
    async fn missing_song_document_fails_the_selection() {
        let coordinator = faulty_coordinator(None, true).await;

        let outcome = coordinator.request_next_song(false).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.state.playback_state, PlaybackPhase::Error);
        assert!(
            outcome
                .state
                .error
                .as_deref()
                .is_some_and(|message| message.starts_with("Failed to select next song"))
        );
        assert!(outcome.state.played_song_ids.is_empty());
        assert_eq!(outcome.state.current_song_id, None);
    }

    #[tokio::test]
    async fn empty_state_update_is_rejected() {
        let (coordinator, _) = coordinator(&["A"]).await;
        assert!(matches!(
            coordinator.request_state_update(GameStateUpdate::default()).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
