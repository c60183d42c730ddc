use tracing::{info, warn};

use crate::{
    dao::repository::SessionRepository,
    dto::{
        player::{AddPlayerRequest, PlayerView, ScoreDeltaRequest},
        sse::PLAYERS_EVENT,
    },
    error::ServiceError,
    services::session_service::ensure_session,
    state::SharedState,
};

async fn list(repository: &SessionRepository, code: &str) -> Result<Vec<PlayerView>, ServiceError> {
    Ok(repository
        .list_players(code)
        .await?
        .into_iter()
        .map(PlayerView::from)
        .collect())
}

async fn broadcast_players(state: &SharedState, repository: &SessionRepository, code: &str) {
    match list(repository, code).await {
        Ok(players) => state.session_hub(code).publish(PLAYERS_EVENT, &players),
        Err(err) => warn!(%code, error = %err, "failed to broadcast player list"),
    }
}

/// Players of an existing session, ordered by name.
pub async fn list_players(
    state: &SharedState,
    code: &str,
) -> Result<Vec<PlayerView>, ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    list(&repository, code).await
}

/// Add a player; names are trimmed and unique per session regardless of case.
pub async fn add_player(
    state: &SharedState,
    code: &str,
    request: AddPlayerRequest,
) -> Result<PlayerView, ServiceError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Player name is required".into()));
    }

    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    if repository
        .player_name_taken(code, &name.to_lowercase())
        .await?
    {
        return Err(ServiceError::Conflict(format!(
            "A player named \"{name}\" already exists"
        )));
    }

    let record = repository.insert_player(code, name).await?;
    info!(%code, id = %record.id, "player added");
    broadcast_players(state, &repository, code).await;
    Ok(record.into())
}

/// Remove a player and broadcast the new roster; 404 when absent.
pub async fn delete_player(state: &SharedState, code: &str, id: &str) -> Result<(), ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    if !repository.delete_player(code, id).await? {
        return Err(ServiceError::NotFound(format!("Player {id} not found")));
    }
    info!(%code, %id, "player removed");
    broadcast_players(state, &repository, code).await;
    Ok(())
}

/// Apply a score delta; the result never drops below zero.
pub async fn adjust_score(
    state: &SharedState,
    code: &str,
    id: &str,
    request: ScoreDeltaRequest,
) -> Result<PlayerView, ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    let player = repository
        .find_player(code, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Player {id} not found")))?;

    let score = player.score.saturating_add(request.delta).max(0);
    let updated = repository.save_score(code, id, score).await?;
    info!(%code, %id, score, "score updated");
    broadcast_players(state, &repository, code).await;

    Ok(PlayerView {
        id: id.to_owned(),
        name: updated.name,
        score: updated.score,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore,
        dto::sse::ServerEvent, services::session_service, state::AppState,
    };

    fn named(name: &str) -> AddPlayerRequest {
        AddPlayerRequest { name: name.into() }
    }

    #[tokio::test]
    async fn names_are_trimmed_and_unique_ignoring_case() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()));
        let code = session_service::create_session(&state).await.unwrap().code;

        let amy = add_player(&state, &code, named("  Amy ")).await.unwrap();
        assert_eq!(amy.name, "Amy");
        assert_eq!(amy.score, 0);

        assert!(matches!(
            add_player(&state, &code, named("aMY")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            add_player(&state, &code, named("   ")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn score_is_floored_at_zero_and_broadcast() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()));
        let code = session_service::create_session(&state).await.unwrap().code;
        let player = add_player(&state, &code, named("Bo")).await.unwrap();
        let mut events = state.session_hub(&code).subscribe();

        let up = adjust_score(&state, &code, &player.id, ScoreDeltaRequest { delta: 1 })
            .await
            .unwrap();
        assert_eq!(up.score, 1);
        let down = adjust_score(&state, &code, &player.id, ScoreDeltaRequest { delta: -5 })
            .await
            .unwrap();
        assert_eq!(down.score, 0);

        let event: ServerEvent = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(PLAYERS_EVENT));

        assert!(matches!(
            adjust_score(&state, &code, "ghost", ScoreDeltaRequest { delta: 1 }).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
