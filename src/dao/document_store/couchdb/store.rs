use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::from_value;
use tracing::debug;

use crate::dao::{
    document::{
        CollectionPath, DocPath, Document, DocumentData, Query, TimestampClock, WriteMode,
        merge_into, resolve_server_timestamps,
    },
    document_store::DocumentStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDocument, END_SUFFIX, collection_prefix, doc_id, is_direct_child,
    },
};

const ALL_DOCS: &str = "_all_docs";
const MAX_CONFLICT_RETRIES: u32 = 5;

/// [`DocumentStore`](crate::dao::document_store::DocumentStore) backed by a CouchDB database over HTTP.
#[derive(Clone)]
pub struct CouchDocumentStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    clock: Arc<TimestampClock>,
}

impl CouchDocumentStore {
    /// Connect to CouchDB and create the database when it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::from(user), Arc::from(pass))),
            clock: Arc::new(TimestampClock::new()),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::Database {
                database: database.clone(),
                action: "query",
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::Database {
                        database: database.clone(),
                        action: "create",
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            status => Err(CouchDaoError::DatabaseStatus { database, status }),
        }
    }

    async fn fetch(&self, doc_id: &str) -> CouchResult<Option<CouchDocument>> {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    doc_id: doc_id.to_owned(),
                    source,
                }),
            status => Err(CouchDaoError::RequestStatus {
                doc_id: doc_id.to_owned(),
                status,
            }),
        }
    }

    async fn put<T: ?Sized + Serialize>(&self, doc_id: &str, body: &T) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, doc_id)
            .json(body)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(put_status_error(doc_id, status)),
        }
    }

    /// Write with the latest revision; a revision conflict re-reads and retries so the
    /// last writer wins.
    async fn write(
        &self,
        path: DocPath,
        mut data: DocumentData,
        mode: WriteMode,
    ) -> CouchResult<Document> {
        let id = doc_id(&path);
        resolve_server_timestamps(&mut data, self.clock.next());

        let mut attempt = 1;
        loop {
            let existing = self.fetch(&id).await?;
            let envelope = prepare_write(id.clone(), existing, data.clone(), mode);
            match self.put(&envelope.id, &envelope).await {
                Ok(()) => return Ok(envelope.into_document(path)),
                Err(CouchDaoError::Conflict { .. }) if attempt < MAX_CONFLICT_RETRIES => {
                    debug!(doc_id = %id, attempt, "CouchDB revision conflict; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn remove(&self, path: DocPath) -> CouchResult<bool> {
        let id = doc_id(&path);
        let Some(existing) = self.fetch(&id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, &id)
            .query(&[("rev", existing.rev.unwrap_or_default())])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(CouchDaoError::RequestStatus { doc_id: id, status }),
        }
    }

    async fn list_children(&self, collection: &CollectionPath) -> CouchResult<Vec<Document>> {
        let prefix = collection_prefix(collection);
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: ALL_DOCS.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                doc_id: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                doc_id: ALL_DOCS.to_owned(),
                source,
            }
        })?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if !is_direct_child(&prefix, &row.id) {
                continue;
            }
            let Some(raw) = row.doc else { continue };
            let envelope: CouchDocument =
                from_value(raw).map_err(|source| CouchDaoError::Envelope {
                    doc_id: row.id.clone(),
                    source,
                })?;
            let child_id = &row.id[prefix.len()..];
            documents.push(envelope.into_document(collection.doc(child_id)));
        }

        Ok(documents)
    }
}

fn put_status_error(doc_id: &str, status: StatusCode) -> CouchDaoError {
    if status == StatusCode::CONFLICT {
        CouchDaoError::Conflict {
            doc_id: doc_id.to_owned(),
        }
    } else {
        CouchDaoError::RequestStatus {
            doc_id: doc_id.to_owned(),
            status,
        }
    }
}

/// Envelope to PUT on top of the current revision.
fn prepare_write(
    id: String,
    existing: Option<CouchDocument>,
    data: DocumentData,
    mode: WriteMode,
) -> CouchDocument {
    let (rev, committed) = match (existing, mode) {
        (Some(mut current), WriteMode::Merge) => {
            merge_into(&mut current.data, data);
            (current.rev, current.data)
        }
        (Some(current), WriteMode::Replace) => (current.rev, data),
        (None, _) => (None, data),
    };
    CouchDocument {
        id,
        rev,
        data: committed,
    }
}

impl DocumentStore for CouchDocumentStore {
    fn get(&self, path: DocPath) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.fetch(&doc_id(&path)).await?;
            Ok(found.map(|envelope| envelope.into_document(path)))
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
            let children = store.list_children(&collection).await?;
            Ok(query.apply(children))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    doc_id: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    doc_id: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
