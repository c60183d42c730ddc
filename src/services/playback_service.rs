use crate::{
    dao::repository::SessionRepository,
    dto::playback::{
        NextSongRequest, PlayMoreRequest, PlaybackResponse, PlayerErrorRequest, SnippetRequest,
    },
    error::ServiceError,
    playback::{
        coordinator::{PlaybackCoordinator, PlaybackOutcome},
        gateway::GameStateGateway,
        state::GameStateUpdate,
    },
    services::session_service::ensure_session,
    state::SharedState,
};

/// Coordinator of `code` over an already validated session.
pub(crate) fn coordinator_for(
    state: &SharedState,
    repository: SessionRepository,
    code: &str,
) -> PlaybackCoordinator {
    let gateway = GameStateGateway::new(repository.store().clone(), state.session_hub(code), code);
    let config = state.config();
    PlaybackCoordinator::new(
        gateway,
        repository,
        config.playback,
        config.end_of_round_message.clone(),
    )
}

async fn coordinator(state: &SharedState, code: &str) -> Result<PlaybackCoordinator, ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    Ok(coordinator_for(state, repository, code))
}

/// Raw partial write on an existing session.
pub async fn update_state(
    state: &SharedState,
    code: &str,
    update: GameStateUpdate,
) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code)
        .await?
        .request_state_update(update)
        .await?;
    Ok(outcome.into())
}

/// Next unplayed song, or any song when the request forces a reset.
pub async fn next_song(
    state: &SharedState,
    code: &str,
    request: NextSongRequest,
) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code)
        .await?
        .request_next_song(request.force_reset_played_ids)
        .await?;
    Ok(outcome.into())
}

/// Snippet sized against the duration the client reported.
pub async fn play_snippet(
    state: &SharedState,
    code: &str,
    request: SnippetRequest,
) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code)
        .await?
        .request_play_snippet(request.duration)
        .await?;
    Ok(outcome.into())
}

/// Resume past the snippet.
pub async fn play_more(
    state: &SharedState,
    code: &str,
    request: PlayMoreRequest,
) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code)
        .await?
        .request_play_more(request.position, request.duration)
        .await?;
    Ok(outcome.into())
}

/// Reveal the title.
pub async fn reveal(state: &SharedState, code: &str) -> Result<PlaybackResponse, ServiceError> {
    Ok(coordinator(state, code).await?.request_reveal().await?.into())
}

/// Pause playback.
pub async fn pause(state: &SharedState, code: &str) -> Result<PlaybackResponse, ServiceError> {
    Ok(coordinator(state, code).await?.request_pause().await?.into())
}

/// Local snippet countdown expired.
pub async fn snippet_elapsed(
    state: &SharedState,
    code: &str,
) -> Result<PlaybackResponse, ServiceError> {
    Ok(coordinator(state, code).await?.report_elapsed().await?.into())
}

/// Client media reached its end.
pub async fn media_ended(state: &SharedState, code: &str) -> Result<PlaybackResponse, ServiceError> {
    Ok(coordinator(state, code)
        .await?
        .report_media_ended()
        .await?
        .into())
}

/// Record a player failure as the session error.
pub async fn player_error(
    state: &SharedState,
    code: &str,
    request: PlayerErrorRequest,
) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code)
        .await?
        .report_player_error(request.message)
        .await?;
    Ok(outcome.into())
}

/// Outcome of a selection that should be followed by an automatic first snippet.
fn with_first_snippet(outcome: PlaybackOutcome) -> PlaybackResponse {
    let play_first_snippet = outcome.applied && outcome.state.has_current_song();
    PlaybackResponse {
        play_first_snippet: Some(play_first_snippet),
        ..outcome.into()
    }
}

/// Select the first song; the response tells the caller to request a snippet once ready.
pub async fn start(state: &SharedState, code: &str) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code).await?.request_start_game().await?;
    Ok(with_first_snippet(outcome))
}

/// Restart the round; like start, the first snippet plays once clients are ready.
pub async fn restart(state: &SharedState, code: &str) -> Result<PlaybackResponse, ServiceError> {
    let outcome = coordinator(state, code)
        .await?
        .request_restart_game()
        .await?;
    Ok(with_first_snippet(outcome))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{document::CollectionPath, document_store::memory::MemoryDocumentStore},
        services::session_service,
        state::AppState,
    };

    #[tokio::test]
    async fn start_and_restart_ask_for_the_first_snippet() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()));
        let code = session_service::create_session(&state).await.unwrap().code;
        let repository = state.repository().await.unwrap();
        repository
            .insert_song(
                &CollectionPath::session_songs(&code),
                "A",
                "https://www.youtube.com/watch?v=a",
            )
            .await
            .unwrap();

        let started = start(&state, &code).await.unwrap();
        assert_eq!(started.play_first_snippet, Some(true));
        assert_eq!(
            started.first_snippet_url(),
            Some("https://www.youtube.com/watch?v=a")
        );

        let ignored = start(&state, &code).await.unwrap();
        assert_eq!(ignored.play_first_snippet, Some(false));
        assert_eq!(ignored.first_snippet_url(), None);

        let restarted = restart(&state, &code).await.unwrap();
        assert_eq!(restarted.play_first_snippet, Some(true));
        assert_eq!(restarted.state.played_song_ids.len(), 1);
    }
}
