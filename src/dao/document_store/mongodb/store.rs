use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, Document as BsonDocument, doc},
    options::{IndexOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    document::{
        CollectionPath, DocPath, Document, DocumentData, Query, TimestampClock, WriteMode,
        resolve_server_timestamps,
    },
    document_store::DocumentStore,
    storage::StorageResult,
};

const DOCUMENTS_COLLECTION: &str = "documents";

/// One row per document path; `parent` indexes collection listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoDocument {
    #[serde(rename = "_id")]
    path: String,
    parent: String,
    #[serde(default)]
    data: DocumentData,
}

/// [`DocumentStore`](crate::dao::document_store::DocumentStore) storing every path in one `documents` collection.
#[derive(Clone)]
pub struct MongoDocumentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
    clock: TimestampClock,
}

struct MongoState {
    _client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        *guard = MongoState {
            _client: client,
            database,
        };
        Ok(())
    }
}

impl MongoDocumentStore {
    /// Connect to MongoDB and make sure the `parent` index exists.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState {
                    _client: client,
                    database,
                }),
                config,
                clock: TimestampClock::new(),
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "parent": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("document_parent_idx".to_owned()))
                    .build(),
            )
            .build();

        self.collection()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: DOCUMENTS_COLLECTION,
                index: "parent",
                source,
            })?;
        Ok(())
    }

    async fn collection(&self) -> Collection<MongoDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoDocument>(DOCUMENTS_COLLECTION)
    }

    async fn find(&self, path: &DocPath) -> MongoResult<Option<MongoDocument>> {
        self.collection()
            .await
            .find_one(doc! { "_id": path.as_str() })
            .await
            .map_err(|source| MongoDaoError::Document {
                path: path.to_string(),
                action: "load",
                source,
            })
    }

    async fn write(
        &self,
        path: DocPath,
        mut data: DocumentData,
        mode: WriteMode,
    ) -> MongoResult<Document> {
        resolve_server_timestamps(&mut data, self.inner.clock.next());
        let save_error = |source| MongoDaoError::Document {
            path: path.to_string(),
            action: "save",
            source,
        };

        let committed = match mode {
            WriteMode::Merge => self
                .collection()
                .await
                .find_one_and_update(doc! { "_id": path.as_str() }, merge_update(&path, data))
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
                .map_err(save_error)?
                .map(|row| row.data)
                .unwrap_or_default(),
            WriteMode::Replace => {
                let record = MongoDocument {
                    path: path.to_string(),
                    parent: path.parent().to_string(),
                    data,
                };
                self.collection()
                    .await
                    .replace_one(doc! { "_id": path.as_str() }, &record)
                    .upsert(true)
                    .await
                    .map_err(save_error)?;
                record.data
            }
        };

        Ok(Document {
            path,
            data: committed,
        })
    }

    async fn remove(&self, path: DocPath) -> MongoResult<bool> {
        let result = self
            .collection()
            .await
            .delete_one(doc! { "_id": path.as_str() })
            .await
            .map_err(|source| MongoDaoError::Document {
                path: path.to_string(),
                action: "delete",
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn children(&self, collection: &CollectionPath) -> MongoResult<Vec<Document>> {
        let list_error = |source| MongoDaoError::ListCollection {
            collection: collection.to_string(),
            source,
        };

        let rows: Vec<MongoDocument> = self
            .collection()
            .await
            .find(doc! { "parent": collection.as_str() })
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let path = DocPath::parse(row.path).ok()?;
                Some(Document {
                    path,
                    data: row.data,
                })
            })
            .collect())
    }
}

/// `$set` of every field under `data.` so concurrent merges of different fields both land.
fn merge_update(path: &DocPath, data: DocumentData) -> BsonDocument {
    let mut set = BsonDocument::new();
    set.insert("parent", path.parent().to_string());
    for (key, value) in data {
        set.insert(format!("data.{key}"), json_to_bson(value));
    }
    doc! { "$set": set }
}

fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(flag) => Bson::Boolean(flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Bson::Int64(int),
            None => Bson::Double(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => Bson::String(text),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(key, value)| (key, json_to_bson(value)))
                .collect(),
        ),
    }
}

impl DocumentStore for MongoDocumentStore {
    fn get(&self, path: DocPath) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.find(&path).await?;
            Ok(found.map(|row| Document {
                path,
                data: row.data,
            }))
        })
    }

    fn set(
        &self,
        path: DocPath,
        data: DocumentData,
        mode: WriteMode,
    ) -> BoxFuture<'static, StorageResult<Document>> {
        let store = self.clone();
        Box::pin(async move { store.write(path, data, mode).await.map_err(Into::into) })
    }

    fn delete(&self, path: DocPath) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.remove(path).await.map_err(Into::into) })
    }

    fn query(
        &self,
        collection: CollectionPath,
        query: Query,
    ) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        let store = self.clone();
        Box::pin(async move {
            let children = store.children(&collection).await?;
            Ok(query.apply(children))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::document::fields;

    #[test]
    fn merge_sets_only_the_given_fields() {
        let path = DocPath::game_state("123456");
        let update = merge_update(
            &path,
            fields(json!({ "playbackState": "paused", "error": null, "seekTime": 1.5 })),
        );

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("parent").unwrap(), "sessions/123456/state");
        assert_eq!(set.get_str("data.playbackState").unwrap(), "paused");
        assert_eq!(set.get("data.error"), Some(&Bson::Null));
        assert_eq!(set.get_f64("data.seekTime").unwrap(), 1.5);
        assert!(!set.contains_key("data.currentSongId"));
    }

    #[test]
    fn json_values_keep_their_shape() {
        let bson = json_to_bson(json!({ "ids": ["a", "b"], "at": 1_700_000_000_000_i64 }));
        let Bson::Document(document) = bson else {
            panic!("expected a document");
        };
        assert_eq!(document.get_i64("at").unwrap(), 1_700_000_000_000);
        assert_eq!(
            document.get_array("ids").unwrap(),
            &vec![Bson::String("a".into()), Bson::String("b".into())]
        );
    }
}
