use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` only when a store is installed and answers its health check.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) if !state.is_degraded().await => HealthResponse::ok(),
            Ok(()) => HealthResponse::degraded(),
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                HealthResponse::degraded()
            }
        },
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            HealthResponse::degraded()
        }
    }
}
