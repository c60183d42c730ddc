/// Paths, queries and the server timestamp sentinel shared by every backend.
pub mod document;
/// Backends implementing the document store abstraction.
pub mod document_store;
/// Persisted shapes of sessions, songs and players.
pub mod models;
/// Typed session layout on top of a document store.
pub mod repository;
/// Backend-independent storage errors.
pub mod storage;
