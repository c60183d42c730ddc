//! Failures raised by the CouchDB document store.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for CouchDB store operations.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures raised while talking to CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Checking or creating the database failed at the transport level.
    #[error("failed to {action} CouchDB database `{database}`")]
    Database {
        database: String,
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} while preparing CouchDB database `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    #[error("CouchDB request for `{doc_id}` could not be sent")]
    RequestSend {
        doc_id: String,
        #[source]
        source: reqwest::Error,
    },
    /// The document changed since its revision was read.
    #[error("CouchDB revision conflict for `{doc_id}`")]
    Conflict { doc_id: String },
    #[error("CouchDB answered {status} for `{doc_id}`")]
    RequestStatus { doc_id: String, status: StatusCode },
    #[error("CouchDB body for `{doc_id}` is not valid JSON")]
    DecodeResponse {
        doc_id: String,
        #[source]
        source: reqwest::Error,
    },
    /// A row exists but does not carry the `{ data: {...} }` envelope.
    #[error("CouchDB document `{doc_id}` has an unexpected shape")]
    Envelope {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },
}
