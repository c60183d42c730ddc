use tracing::{info, warn};

use crate::{
    dao::{document::CollectionPath, repository::SessionRepository},
    dto::{
        song::{AddSongRequest, AddSongResponse, SongView},
        sse::SONGS_EVENT,
    },
    error::ServiceError,
    services::{playback_service, session_service::ensure_session},
    state::SharedState,
};

async fn list(
    repository: &SessionRepository,
    collection: &CollectionPath,
) -> Result<Vec<SongView>, ServiceError> {
    Ok(repository
        .list_songs(collection)
        .await?
        .into_iter()
        .map(SongView::from)
        .collect())
}

async fn broadcast_songs(state: &SharedState, repository: &SessionRepository, code: &str) {
    match list(repository, &CollectionPath::session_songs(code)).await {
        Ok(songs) => state.session_hub(code).publish(SONGS_EVENT, &songs),
        Err(err) => warn!(%code, error = %err, "failed to broadcast song list"),
    }
}

/// Insert into `collection` unless the URL is already present there.
async fn insert_unique(
    repository: &SessionRepository,
    collection: &CollectionPath,
    request: AddSongRequest,
) -> Result<AddSongResponse, ServiceError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ServiceError::InvalidInput("Missing title or url in request body".into()));
    }
    let url = request.url.trim();
    if repository.song_url_exists(collection, url).await? {
        return Err(ServiceError::Conflict("Song with this URL already exists".into()));
    }
    let record = repository.insert_song(collection, title, url).await?;
    info!(collection = %collection, id = %record.id, "song added");
    Ok(record.into())
}

/// Songs of an existing session, newest first.
pub async fn list_session_songs(
    state: &SharedState,
    code: &str,
) -> Result<Vec<SongView>, ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    list(&repository, &CollectionPath::session_songs(code)).await
}

/// Add a song to session `code` and broadcast the new list.
pub async fn add_session_song(
    state: &SharedState,
    code: &str,
    request: AddSongRequest,
) -> Result<AddSongResponse, ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    let added = insert_unique(&repository, &CollectionPath::session_songs(code), request).await?;
    broadcast_songs(state, &repository, code).await;
    Ok(added)
}

/// Remove a song; removing the current song moves the session to the next one.
pub async fn delete_session_song(
    state: &SharedState,
    code: &str,
    id: &str,
) -> Result<(), ServiceError> {
    let repository = state.repository().await?;
    ensure_session(&repository, code).await?;
    if !repository
        .delete_song(&CollectionPath::session_songs(code), id)
        .await?
    {
        return Err(ServiceError::NotFound(format!("Song {id} not found")));
    }
    info!(%code, %id, "song deleted");
    broadcast_songs(state, &repository, code).await;

    let coordinator = playback_service::coordinator_for(state, repository, code);
    let current = coordinator.current_state().await?;
    if current.current_song_id.as_deref() == Some(id) {
        info!(%code, %id, "current song deleted; selecting another");
        coordinator.request_next_song(false).await?;
    }
    Ok(())
}

/// Songs of the global library, newest first.
pub async fn list_library(state: &SharedState) -> Result<Vec<SongView>, ServiceError> {
    let repository = state.repository().await?;
    list(&repository, &CollectionPath::library_songs()).await
}

/// Add to the session named in the request, or to the global library without one.
pub async fn add_song(
    state: &SharedState,
    mut request: AddSongRequest,
) -> Result<AddSongResponse, ServiceError> {
    match request.session_code.take() {
        Some(code) => add_session_song(state, &code, request).await,
        None => {
            let repository = state.repository().await?;
            insert_unique(&repository, &CollectionPath::library_songs(), request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::document_store::memory::MemoryDocumentStore,
        services::session_service,
        state::AppState,
    };

    fn request(title: &str, url: &str) -> AddSongRequest {
        AddSongRequest {
            title: title.into(),
            url: url.into(),
            session_code: None,
        }
    }

    #[tokio::test]
    async fn duplicate_urls_conflict_per_collection() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()));
        let code = session_service::create_session(&state).await.unwrap().code;
        let url = "https://www.youtube.com/watch?v=abc";

        add_session_song(&state, &code, request("One", url)).await.unwrap();
        assert!(matches!(
            add_session_song(&state, &code, request("Again", url)).await,
            Err(ServiceError::Conflict(_))
        ));

        add_song(&state, request("Library", url)).await.unwrap();
        assert_eq!(list_library(&state).await.unwrap().len(), 1);
        assert_eq!(list_session_songs(&state, &code).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_the_current_song_selects_another() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()));
        let code = session_service::create_session(&state).await.unwrap().code;
        add_session_song(&state, &code, request("A", "https://www.youtube.com/watch?v=a"))
            .await
            .unwrap();
        add_session_song(&state, &code, request("B", "https://www.youtube.com/watch?v=b"))
            .await
            .unwrap();

        let started = playback_service::start(&state, &code).await.unwrap();
        let current = started.state.current_song_id.clone().unwrap();

        delete_session_song(&state, &code, &current).await.unwrap();

        let snapshot = session_service::snapshot(&state, &code).await.unwrap();
        let next = snapshot.state.current_song_id.unwrap();
        assert_ne!(next, current);
        assert!(
            list_session_songs(&state, &code)
                .await
                .unwrap()
                .iter()
                .any(|song| song.id == next)
        );
    }

    #[tokio::test]
    async fn deleting_an_unknown_song_is_not_found() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryDocumentStore::new()));
        let code = session_service::create_session(&state).await.unwrap().code;
        assert!(matches!(
            delete_session_song(&state, &code, "missing").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
