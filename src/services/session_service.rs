use rand::Rng;
use tracing::{info, warn};

use crate::{
    dao::repository::SessionRepository,
    dto::{
        player::PlayerView,
        session::{CreateSessionResponse, GameSnapshot, JoinSessionResponse},
        sse::GAME_STATE_EVENT,
        validation::validate_session_code,
    },
    error::ServiceError,
    playback::gateway::GameStateGateway,
    state::SharedState,
};

const CODE_ATTEMPTS: usize = 5;

fn random_code() -> String {
    rand::rng().random_range(100_000..1_000_000u32).to_string()
}

/// Reject malformed codes (400) and unknown sessions (404).
pub(crate) async fn ensure_session(
    repository: &SessionRepository,
    code: &str,
) -> Result<i64, ServiceError> {
    validate_session_code(code).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| "Invalid session code".into()),
        )
    })?;
    match repository.find_session(code).await? {
        Some(session) => Ok(session.created_at),
        None => Err(ServiceError::NotFound(format!("Session {code} not found"))),
    }
}

/// Allocate an unused six-digit code and write the session with its initial playback state.
pub async fn create_session(state: &SharedState) -> Result<CreateSessionResponse, ServiceError> {
    let repository = state.repository().await?;

    for attempt in 1..=CODE_ATTEMPTS {
        let code = random_code();
        if repository.find_session(&code).await?.is_some() {
            warn!(attempt, %code, "session code collision");
            continue;
        }
        let initial = repository.create_session(&code).await?;
        state.session_hub(&code).publish(GAME_STATE_EVENT, &initial);
        info!(%code, "session created");
        return Ok(CreateSessionResponse { code });
    }

    Err(ServiceError::Internal(
        "Failed to generate a unique session code".into(),
    ))
}

/// Creation time of an existing session.
pub async fn join_session(
    state: &SharedState,
    code: &str,
) -> Result<JoinSessionResponse, ServiceError> {
    let repository = state.repository().await?;
    let created_at = ensure_session(&repository, code).await?;
    info!(%code, "session joined");
    Ok(JoinSessionResponse::new(code.to_owned(), created_at))
}

/// Playback document and roster; the document is initialised when missing.
pub async fn snapshot(state: &SharedState, code: &str) -> Result<GameSnapshot, ServiceError> {
    let store = state.require_store().await?;
    let repository = SessionRepository::new(store.clone());
    ensure_session(&repository, code).await?;

    let gateway = GameStateGateway::new(store, state.session_hub(code), code);
    let game_state = gateway.load().await?;
    let players = repository
        .list_players(code)
        .await?
        .into_iter()
        .map(PlayerView::from)
        .collect();

    Ok(GameSnapshot {
        state: game_state,
        players,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore, state::AppState,
    };

    fn state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()))
    }

    #[test]
    fn generated_codes_have_six_digits() {
        for _ in 0..100 {
            let code = random_code();
            assert!(validate_session_code(&code).is_ok(), "{code}");
        }
    }

    #[tokio::test]
    async fn created_sessions_can_be_joined() {
        let state = state();
        let created = create_session(&state).await.unwrap();

        let joined = join_session(&state, &created.code).await.unwrap();
        assert_eq!(joined.code, created.code);
        assert!(joined.created_at.is_some());

        let snapshot = snapshot(&state, &created.code).await.unwrap();
        assert!(snapshot.players.is_empty());
        assert!(!snapshot.state.has_current_song());
    }

    #[tokio::test]
    async fn join_rejects_bad_and_unknown_codes() {
        let state = state();
        assert!(matches!(
            join_session(&state, "12ab56").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            join_session(&state, "999999").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
