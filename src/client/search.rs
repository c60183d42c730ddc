//! Debounced search-as-you-type against the backend search proxy.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures::{FutureExt, future::BoxFuture};
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::debug;

use crate::{
    client::{
        error::ClientResult,
        http::status_error,
    },
    config::SearchSettings,
    dto::search::SearchResult,
};

/// Source of search results.
pub trait SearchBackend: Send + Sync + 'static {
    fn search(&self, term: String) -> BoxFuture<'static, ClientResult<Vec<SearchResult>>>;
}

/// Calls `GET /api/youtube-search`.
#[derive(Clone)]
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSearchClient {
    /// `base_url` is the server root.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: Into::<String>::into(base_url).trim_end_matches('/').to_owned(),
        }
    }
}

impl SearchBackend for HttpSearchClient {
    fn search(&self, term: String) -> BoxFuture<'static, ClientResult<Vec<SearchResult>>> {
        let request = self
            .http
            .get(format!("{}/api/youtube-search", self.base_url))
            .query(&[("q", term)]);
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(status_error(response).await);
            }
            Ok(response.json::<Vec<SearchResult>>().await?)
        }
        .boxed()
    }
}

/// What the search box should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchState {
    /// Term too short; nothing shown.
    #[default]
    Idle,
    /// A request is in flight.
    Searching,
    /// Latest results, possibly empty.
    Results(Vec<SearchResult>),
    /// Message of the failed request.
    Failed(String),
}

/// Waits for typing to pause before searching; a new term cancels the pending one.
pub struct SearchDebouncer<B: SearchBackend> {
    backend: Arc<B>,
    debounce: Duration,
    min_term_length: usize,
    pending: Mutex<Option<JoinHandle<()>>>,
    state: Arc<watch::Sender<SearchState>>,
}

impl<B: SearchBackend> SearchDebouncer<B> {
    /// Debouncer using the timing and minimum length of `settings`.
    pub fn new(backend: B, settings: &SearchSettings) -> Self {
        let (state, _rx) = watch::channel(SearchState::Idle);
        Self {
            backend: Arc::new(backend),
            debounce: settings.debounce,
            min_term_length: settings.min_term_length,
            pending: Mutex::new(None),
            state: Arc::new(state),
        }
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Latest state.
    pub fn current(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Handle a change of the search box.
    pub fn input(&self, term: &str) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let term = term.trim().to_owned();
        if term.chars().count() < self.min_term_length {
            self.state.send_replace(SearchState::Idle);
            return;
        }

        let backend = self.backend.clone();
        let state = self.state.clone();
        let debounce = self.debounce;
        *pending = Some(tokio::spawn(async move {
            sleep(debounce).await;
            debug!(%term, "searching");
            state.send_replace(SearchState::Searching);
            let next = match backend.search(term).await {
                Ok(results) => SearchState::Results(results),
                Err(err) => SearchState::Failed(err.to_string()),
            };
            state.send_replace(next);
        }));
    }
}

impl<B: SearchBackend> Drop for SearchDebouncer<B> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        terms: Mutex<Vec<String>>,
    }

    impl SearchBackend for Arc<FakeBackend> {
        fn search(&self, term: String) -> BoxFuture<'static, ClientResult<Vec<SearchResult>>> {
            self.terms.lock().unwrap().push(term.clone());
            async move {
                Ok(vec![SearchResult {
                    video_id: term.clone(),
                    title: term.clone(),
                    thumbnail: None,
                    url: format!("https://www.youtube.com/watch?v={term}"),
                }])
            }
            .boxed()
        }
    }

    fn debouncer() -> (SearchDebouncer<Arc<FakeBackend>>, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        (SearchDebouncer::new(backend.clone(), &SearchSettings::default()), backend)
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_term_is_searched() {
        let (debouncer, backend) = debouncer();
        debouncer.input("que");
        sleep(Duration::from_millis(200)).await;
        debouncer.input("queen");
        sleep(Duration::from_millis(499)).await;
        assert!(backend.terms.lock().unwrap().is_empty());

        sleep(Duration::from_millis(10)).await;
        assert_eq!(*backend.terms.lock().unwrap(), ["queen"]);
        match debouncer.current() {
            SearchState::Results(results) => assert_eq!(results[0].video_id, "queen"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_terms_clear_without_a_request() {
        let (debouncer, backend) = debouncer();
        debouncer.input("queen");
        sleep(Duration::from_millis(100)).await;
        debouncer.input(" qu ");
        sleep(Duration::from_secs(2)).await;

        assert!(backend.terms.lock().unwrap().is_empty());
        assert_eq!(debouncer.current(), SearchState::Idle);
    }
}
