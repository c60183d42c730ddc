//! Shared application state.

mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{document_store::DocumentStore, repository::SessionRepository},
    error::ServiceError,
};

pub use self::sse::SseHub;

/// Handle shared by every handler.
pub type SharedState = Arc<AppState>;

/// Central application state: the installed document store, per-session hubs and configuration.
pub struct AppState {
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    degraded: watch::Sender<bool>,
    sessions: DashMap<String, Arc<SseHub>>,
    config: AppConfig,
    http: reqwest::Client,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a document store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
            sessions: DashMap::new(),
            config,
            http: reqwest::Client::new(),
        })
    }

    /// Construct a state with `store` already installed.
    pub fn with_store(config: AppConfig, store: Arc<dyn DocumentStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            store: RwLock::new(Some(store)),
            degraded: degraded_tx,
            sessions: DashMap::new(),
            config,
            http: reqwest::Client::new(),
        })
    }

    /// Retrieve the current document store or report degraded mode.
    pub async fn require_store(&self) -> Result<Arc<dyn DocumentStore>, ServiceError> {
        let guard = self.store.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Repository over the current document store.
    pub async fn repository(&self) -> Result<SessionRepository, ServiceError> {
        Ok(SessionRepository::new(self.require_store().await?))
    }

    /// Install a new document store and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn DocumentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub of session `code`, created on first use.
    pub fn session_hub(&self, code: &str) -> Arc<SseHub> {
        self.sessions
            .entry(code.to_owned())
            .or_insert_with(|| Arc::new(SseHub::new(self.config.sse_capacity)))
            .clone()
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Outbound HTTP client shared by the search proxy.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::document_store::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded().await);
        assert!(matches!(state.require_store().await, Err(ServiceError::Degraded)));

        state.set_store(Arc::new(MemoryDocumentStore::new())).await;

        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_store().await.is_ok());
    }

    #[test]
    fn session_hubs_are_shared_per_code() {
        let state = AppState::new(AppConfig::default());
        let first = state.session_hub("123456");
        let again = state.session_hub("123456");
        let other = state.session_hub("654321");

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
