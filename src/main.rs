//! Song Guess Back binary entrypoint wiring REST, SSE and the document store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, http::HeaderValue};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use song_guess_back::{
    config::AppConfig,
    dao::document_store::{DocumentStore, memory::MemoryDocumentStore},
    routes,
    state::{AppState, SharedState},
};

const DEFAULT_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let cors = cors_layer(&config.cors_origins);
    let app_state = build_state(config)?;
    let app = build_router(app_state, cors);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the document store from `STORE_BACKEND`; remote stores start degraded
/// and are installed by the storage supervisor once reachable.
fn build_state(config: AppConfig) -> anyhow::Result<SharedState> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_owned());
    match backend.as_str() {
        "memory" => {
            info!("using in-memory document store");
            Ok(AppState::with_store(config, Arc::new(MemoryDocumentStore::new())))
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use song_guess_back::{
                dao::{
                    document_store::mongodb::{MongoConfig, MongoDocumentStore},
                    storage::StorageError,
                },
                services::storage_supervisor,
            };

            let state = AppState::new(config);
            tokio::spawn(storage_supervisor::run(state.clone(), || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoDocumentStore::connect(config).await?;
                Ok::<Arc<dyn DocumentStore>, StorageError>(Arc::new(store))
            }));
            Ok(state)
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use song_guess_back::{
                dao::{
                    document_store::couchdb::{CouchConfig, CouchDocumentStore},
                    storage::StorageError,
                },
                services::storage_supervisor,
            };

            let couch = CouchConfig::from_env().context("reading CouchDB settings")?;
            let state = AppState::new(config);
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let couch = couch.clone();
                async move {
                    let store = CouchDocumentStore::connect(couch).await?;
                    Ok::<Arc<dyn DocumentStore>, StorageError>(Arc::new(store))
                }
            }));
            Ok(state)
        }
        other => anyhow::bail!("unsupported STORE_BACKEND {other:?}"),
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, cors: CorsLayer) -> Router<()> {
    routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
