use std::{collections::BTreeSet, sync::Arc};

use serde_json::json;

use crate::{
    dao::{
        document::{
            CollectionPath, Direction, DocPath, Document, Query, WriteMode, fields,
            server_timestamp,
        },
        document_store::DocumentStore,
        models::{PlayerEntity, Record, SessionEntity, SongEntity},
        storage::StorageResult,
    },
    playback::state::GameState,
};

fn decode_all<T: serde::de::DeserializeOwned>(docs: Vec<Document>) -> StorageResult<Vec<Record<T>>> {
    docs.into_iter()
        .map(|doc| {
            Ok(Record {
                id: doc.id().to_owned(),
                value: doc.decode()?,
            })
        })
        .collect()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Typed access to the session layout on top of a [`DocumentStore`].
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn DocumentStore>,
}

impl SessionRepository {
    /// Wrap a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Underlying store, for callers that need raw paths.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Session marker, `None` when the code is unknown.
    pub async fn find_session(&self, code: &str) -> StorageResult<Option<SessionEntity>> {
        match self.store.get(DocPath::session(code)).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Write the session marker and its initial playback document.
    pub async fn create_session(&self, code: &str) -> StorageResult<GameState> {
        self.store
            .set(
                DocPath::session(code),
                fields(json!({ "createdAt": server_timestamp() })),
                WriteMode::Replace,
            )
            .await?;
        let committed = self
            .store
            .set(
                DocPath::game_state(code),
                GameState::initial_update().into_document(),
                WriteMode::Replace,
            )
            .await?;
        committed.decode()
    }

    /// Songs of `collection`, newest first.
    pub async fn list_songs(
        &self,
        collection: &CollectionPath,
    ) -> StorageResult<Vec<Record<SongEntity>>> {
        let docs = self
            .store
            .query(
                collection.clone(),
                Query::all().order_by("createdAt", Direction::Descending),
            )
            .await?;
        decode_all(docs)
    }

    /// Ids of every song in `collection`.
    pub async fn song_ids(&self, collection: &CollectionPath) -> StorageResult<BTreeSet<String>> {
        let docs = self.store.query(collection.clone(), Query::all()).await?;
        Ok(docs.iter().map(|doc| doc.id().to_owned()).collect())
    }

    /// Song `id` of `collection`, if stored.
    pub async fn find_song(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> StorageResult<Option<SongEntity>> {
        match self.store.get(collection.doc(id)).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Whether `collection` already holds a song with exactly this URL.
    pub async fn song_url_exists(
        &self,
        collection: &CollectionPath,
        url: &str,
    ) -> StorageResult<bool> {
        let docs = self
            .store
            .query(collection.clone(), Query::all().where_eq("url", url).limit(1))
            .await?;
        Ok(!docs.is_empty())
    }

    /// Store a new song under a generated id.
    pub async fn insert_song(
        &self,
        collection: &CollectionPath,
        title: &str,
        url: &str,
    ) -> StorageResult<Record<SongEntity>> {
        let id = new_id();
        let data = fields(json!({ "title": title, "url": url, "createdAt": server_timestamp() }));
        let doc = self
            .store
            .set(collection.doc(&id), data, WriteMode::Replace)
            .await?;
        Ok(Record {
            id,
            value: doc.decode()?,
        })
    }

    /// Remove a song; `false` when it did not exist.
    pub async fn delete_song(&self, collection: &CollectionPath, id: &str) -> StorageResult<bool> {
        self.store.delete(collection.doc(id)).await
    }

    /// Players of a session ordered by name.
    pub async fn list_players(&self, code: &str) -> StorageResult<Vec<Record<PlayerEntity>>> {
        let docs = self
            .store
            .query(
                CollectionPath::session_players(code),
                Query::all().order_by("name", Direction::Ascending),
            )
            .await?;
        decode_all(docs)
    }

    /// Whether a player with this lower-cased name already joined.
    pub async fn player_name_taken(&self, code: &str, name_lower: &str) -> StorageResult<bool> {
        let docs = self
            .store
            .query(
                CollectionPath::session_players(code),
                Query::all().where_eq("nameLower", name_lower).limit(1),
            )
            .await?;
        Ok(!docs.is_empty())
    }

    /// Add a player with a zero score.
    pub async fn insert_player(&self, code: &str, name: &str) -> StorageResult<Record<PlayerEntity>> {
        let id = new_id();
        let data = fields(json!({
            "name": name,
            "nameLower": name.to_lowercase(),
            "score": 0,
            "createdAt": server_timestamp(),
        }));
        let doc = self
            .store
            .set(
                CollectionPath::session_players(code).doc(&id),
                data,
                WriteMode::Replace,
            )
            .await?;
        Ok(Record {
            id,
            value: doc.decode()?,
        })
    }

    /// Player `id` of session `code`, if stored.
    pub async fn find_player(&self, code: &str, id: &str) -> StorageResult<Option<PlayerEntity>> {
        match self
            .store
            .get(CollectionPath::session_players(code).doc(id))
            .await?
        {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Merge a new score into the player document.
    pub async fn save_score(&self, code: &str, id: &str, score: i64) -> StorageResult<PlayerEntity> {
        let data = fields(json!({ "score": score }));
        let doc = self
            .store
            .set(
                CollectionPath::session_players(code).doc(id),
                data,
                WriteMode::Merge,
            )
            .await?;
        doc.decode()
    }

    /// Remove a player; `false` when it did not exist.
    pub async fn delete_player(&self, code: &str, id: &str) -> StorageResult<bool> {
        self.store
            .delete(CollectionPath::session_players(code).doc(id))
            .await
    }
}
