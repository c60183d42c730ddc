use std::{collections::BTreeMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    document::{
        CollectionPath, DocPath, Document, DocumentData, Query, TimestampClock, WriteMode,
        merge_into, resolve_server_timestamps,
    },
    document_store::DocumentStore,
    storage::StorageResult,
};

/// Process-local store used for local play and tests.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<BTreeMap<DocPath, DocumentData>>>,
    clock: Arc<TimestampClock>,
}

impl MemoryDocumentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, path: DocPath) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.documents.read().await;
            Ok(guard.get(&path).map(|data| Document {
                path: path.clone(),
                data: data.clone(),
            }))
        })
    }

    fn set(
        &self,
        path: DocPath,
        mut data: DocumentData,
        mode: WriteMode,
    ) -> BoxFuture<'static, StorageResult<Document>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.documents.write().await;
            resolve_server_timestamps(&mut data, store.clock.next());
            let committed = match (mode, guard.remove(&path)) {
                (WriteMode::Merge, Some(mut existing)) => {
                    merge_into(&mut existing, data);
                    existing
                }
                _ => data,
            };
            guard.insert(path.clone(), committed.clone());
            Ok(Document {
                path,
                data: committed,
            })
        })
    }

    fn delete(&self, path: DocPath) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.documents.write().await.remove(&path).is_some()) })
    }

    fn query(
        &self,
        collection: CollectionPath,
        query: Query,
    ) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.documents.read().await;
            let children = guard
                .iter()
                .filter(|(path, _)| collection.contains(path))
                .map(|(path, data)| Document {
                    path: path.clone(),
                    data: data.clone(),
                });
            Ok(query.apply(children))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::dao::document::{Direction, server_timestamp};

    fn data(value: Value) -> DocumentData {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields_and_stamps_time() {
        let store = MemoryDocumentStore::new();
        let path = DocPath::game_state("123456");

        store
            .set(path.clone(), data(json!({ "a": 1, "b": 2 })), WriteMode::Replace)
            .await
            .unwrap();
        let merged = store
            .set(
                path.clone(),
                data(json!({ "b": 3, "at": server_timestamp() })),
                WriteMode::Merge,
            )
            .await
            .unwrap();

        assert_eq!(merged.data["a"], json!(1));
        assert_eq!(merged.data["b"], json!(3));
        assert!(merged.data["at"].is_i64());
        assert_eq!(store.get(path).await.unwrap().unwrap(), merged);
    }

    #[tokio::test]
    async fn replace_drops_previous_fields() {
        let store = MemoryDocumentStore::new();
        let path = DocPath::session("123456");
        store
            .set(path.clone(), data(json!({ "a": 1 })), WriteMode::Replace)
            .await
            .unwrap();
        let replaced = store
            .set(path, data(json!({ "b": 2 })), WriteMode::Replace)
            .await
            .unwrap();
        assert!(!replaced.data.contains_key("a"));
    }

    #[tokio::test]
    async fn query_returns_direct_children_only() {
        let store = MemoryDocumentStore::new();
        let songs = CollectionPath::session_songs("123456");
        for (id, created) in [("a", 1), ("b", 2)] {
            store
                .set(songs.doc(id), data(json!({ "createdAt": created })), WriteMode::Replace)
                .await
                .unwrap();
        }
        store
            .set(
                CollectionPath::session_songs("654321").doc("z"),
                data(json!({ "createdAt": 3 })),
                WriteMode::Replace,
            )
            .await
            .unwrap();
        store
            .set(DocPath::session("123456"), data(json!({})), WriteMode::Replace)
            .await
            .unwrap();

        let found = store
            .query(songs, Query::all().order_by("createdAt", Direction::Descending))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(Document::id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryDocumentStore::new();
        let path = DocPath::session("123456");
        store
            .set(path.clone(), data(json!({})), WriteMode::Replace)
            .await
            .unwrap();
        assert!(store.delete(path.clone()).await.unwrap());
        assert!(!store.delete(path).await.unwrap());
    }
}
