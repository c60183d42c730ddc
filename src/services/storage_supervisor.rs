use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{document_store::DocumentStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Try to bring a failing store back; flips degraded mode on the first failed attempt.
async fn recover(state: &SharedState, store: &Arc<dyn DocumentStore>) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "document store reconnected after failed health check");
                state.update_degraded(false).await;
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "document store reconnect failed; entering degraded mode");
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "document store reconnect failed");
                }
                sleep(delay).await;
                delay = backoff(delay);
            }
        }
    }
    false
}

/// Connect the document store, then watch it, keeping the shared state degraded while it is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DocumentStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "document store connection attempt failed");
                sleep(delay).await;
                delay = backoff(delay);
                continue;
            }
        };

        state.set_store(store.clone()).await;
        info!("document store connected; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            match store.health_check().await {
                Ok(()) => {
                    if state.is_degraded().await {
                        info!("document store healthy again; leaving degraded mode");
                        state.update_degraded(false).await;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "document store health check failed");
                    if !recover(&state, &store).await {
                        warn!("exhausted reconnect attempts; opening a new connection");
                        break;
                    }
                }
            }
            sleep(HEALTH_POLL_INTERVAL).await;
        }

        sleep(delay).await;
        delay = backoff(delay);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{config::AppConfig, dao::document_store::memory::MemoryDocumentStore, state::AppState};

    #[tokio::test(start_paused = true)]
    async fn retries_until_a_store_connects() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let supervisor = tokio::spawn(run(state.clone(), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(StorageError::unavailable(
                        "refused".into(),
                        std::io::Error::other("refused"),
                    ))
                } else {
                    Ok(Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>)
                }
            }
        }));

        sleep(Duration::from_secs(4)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!state.is_degraded().await);
        assert!(state.require_store().await.is_ok());
        supervisor.abort();
    }
}
