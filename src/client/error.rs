//! Errors of the embedded client.

use thiserror::Error;

/// Result alias for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failure of a call made by the embedded client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed event payload")]
    Decode(#[from] serde_json::Error),
}
