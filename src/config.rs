//! Application-level configuration loading: playback timing, search tuning and CORS.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::playback::timing::PlaybackTiming;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SONG_GUESS_BACK_CONFIG_PATH";
/// Environment variable holding the YouTube Data API key.
const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";
const DEFAULT_END_OF_ROUND_MESSAGE: &str = "All songs played!";

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
/// Tuning of the YouTube search proxy and of the client-side debouncer.
pub struct SearchSettings {
    /// YouTube Data API search endpoint.
    pub api_base_url: String,
    /// Results requested per search.
    pub max_results: u32,
    /// Category filter; `10` is Music.
    pub video_category_id: String,
    /// Shortest trimmed term that triggers a request.
    pub min_term_length: usize,
    /// Quiet period before the client debouncer fires, in milliseconds.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub debounce: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/youtube/v3/search".into(),
            max_results: 10,
            video_category_id: "10".into(),
            min_term_length: 3,
            debounce: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Snippet and play-more timings.
    pub playback: PlaybackTiming,
    /// Search proxy tuning.
    pub search: SearchSettings,
    /// Title shown once every song of the round was played.
    pub end_of_round_message: String,
    /// Allowed CORS origins; empty means permissive.
    pub cors_origins: Vec<String>,
    /// Buffered events per session hub before slow subscribers lag.
    pub sse_capacity: usize,
    /// Never read from the file.
    #[serde(skip)]
    pub youtube_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackTiming::default(),
            search: SearchSettings::default(),
            end_of_round_message: DEFAULT_END_OF_ROUND_MESSAGE.into(),
            cors_origins: Vec::new(),
            sse_capacity: 64,
            youtube_api_key: None,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then read secrets from the environment.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    let config = config.sanitized();
                    info!(
                        path = %path.display(),
                        snippet_secs = config.playback.snippet_duration.as_secs_f64(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.youtube_api_key = env::var(YOUTUBE_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if config.youtube_api_key.is_none() {
            warn!("{YOUTUBE_API_KEY_ENV} is not set; search requests will fail");
        }
        config
    }

    /// Replace values the runtime cannot work with.
    fn sanitized(mut self) -> Self {
        if self.sse_capacity == 0 {
            warn!("sse_capacity must be positive; using 1");
            self.sse_capacity = 1;
        }
        self
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
