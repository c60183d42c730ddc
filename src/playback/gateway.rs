//! Single write path of the shared playback document.

use std::sync::Arc;

use tracing::debug;

use crate::{
    dao::{
        document::{DocPath, WriteMode},
        document_store::DocumentStore,
        storage::StorageResult,
    },
    dto::sse::GAME_STATE_EVENT,
    playback::state::{GameState, GameStateUpdate},
    state::SseHub,
};

/// The only writer of `sessions/{code}/state/current_game`.
///
/// Every committed write is re-read from the store (so the server timestamp is resolved)
/// and fanned out to the session hub, including to the client that asked for it.
#[derive(Clone)]
pub struct GameStateGateway {
    store: Arc<dyn DocumentStore>,
    hub: Arc<SseHub>,
    code: String,
}

impl GameStateGateway {
    /// Gateway of session `code`, broadcasting through `hub`.
    pub fn new(store: Arc<dyn DocumentStore>, hub: Arc<SseHub>, code: impl Into<String>) -> Self {
        Self {
            store,
            hub,
            code: code.into(),
        }
    }

    /// Session code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Current shared state, writing the initial document when it is missing.
    pub async fn load(&self) -> StorageResult<GameState> {
        match self.store.get(DocPath::game_state(&self.code)).await? {
            Some(doc) => doc.decode(),
            None => {
                debug!(code = %self.code, "game state missing; writing initial document");
                self.write(GameState::initial_update(), WriteMode::Replace)
                    .await
            }
        }
    }

    /// Merge `update` into the shared state and broadcast the result.
    pub async fn publish(&self, update: GameStateUpdate) -> StorageResult<GameState> {
        self.write(update, WriteMode::Merge).await
    }

    async fn write(&self, update: GameStateUpdate, mode: WriteMode) -> StorageResult<GameState> {
        let committed = self
            .store
            .set(DocPath::game_state(&self.code), update.into_document(), mode)
            .await?;
        let state: GameState = committed.decode()?;
        debug!(
            code = %self.code,
            phase = ?state.playback_state,
            song = state.current_song_id.as_deref().unwrap_or("-"),
            "game state committed"
        );
        self.hub.publish(GAME_STATE_EVENT, &state);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::document_store::memory::MemoryDocumentStore, playback::state::PlaybackPhase,
    };

    #[tokio::test]
    async fn publish_merges_and_broadcasts() {
        let hub = Arc::new(SseHub::new(8));
        let mut events = hub.subscribe();
        let gateway = GameStateGateway::new(Arc::new(MemoryDocumentStore::new()), hub, "123456");

        let initial = gateway.load().await.unwrap();
        assert_eq!(initial.playback_state, PlaybackPhase::Paused);

        let updated = gateway
            .publish(GameStateUpdate::phase(PlaybackPhase::Revealed))
            .await
            .unwrap();
        assert_eq!(updated.playback_state, PlaybackPhase::Revealed);
        assert!(updated.last_action_timestamp > initial.last_action_timestamp);

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(GAME_STATE_EVENT));
        let broadcast: GameState = serde_json::from_str(&second.data).unwrap();
        assert_eq!(broadcast, updated);
    }
}
