//! Library crate for song-guess-back, exposing modules for binaries and integration tests.

pub mod client;
pub mod config;
/// Document storage and the typed session layout.
pub mod dao;
/// Request and response bodies.
pub mod dto;
pub mod error;
pub mod playback;
/// Axum routers and handlers.
pub mod routes;
/// Business logic behind the handlers.
pub mod services;
pub mod state;
