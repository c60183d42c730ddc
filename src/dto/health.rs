use serde::Serialize;
use utoipa::ToSchema;

/// Body of `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while a document store is installed and answering, `degraded` otherwise.
    pub status: &'static str,
}

impl HealthResponse {
    /// Store installed and answering.
    pub fn ok() -> Self {
        Self { status: "ok" }
    }

    /// No usable store.
    pub fn degraded() -> Self {
        Self { status: "degraded" }
    }
}
