/// CouchDB over HTTP.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process store.
pub mod memory;
/// MongoDB through the official driver.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    document::{CollectionPath, DocPath, Document, DocumentData, Query, WriteMode},
    storage::StorageResult,
};

/// Abstraction over the document database holding sessions, songs, players and game state.
///
/// Writes resolve [`server_timestamp`](crate::dao::document::server_timestamp) sentinels
/// at commit time and return the committed document so callers can fan it out.
pub trait DocumentStore: Send + Sync {
    /// Document at `path`, if any.
    fn get(&self, path: DocPath) -> BoxFuture<'static, StorageResult<Option<Document>>>;
    /// Write `data` at `path` and return the committed document.
    fn set(
        &self,
        path: DocPath,
        data: DocumentData,
        mode: WriteMode,
    ) -> BoxFuture<'static, StorageResult<Document>>;
    /// Remove a document, returning whether it existed.
    fn delete(&self, path: DocPath) -> BoxFuture<'static, StorageResult<bool>>;
    /// Direct children of `collection` matching `query`.
    fn query(
        &self,
        collection: CollectionPath,
        query: Query,
    ) -> BoxFuture<'static, StorageResult<Vec<Document>>>;
    /// Cheap round trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
