//! Client side of the session event stream.

use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::{
    client::{
        error::{ClientError, ClientResult},
        http::status_error,
    },
    dto::sse::{GAME_STATE_EVENT, ServerEvent},
    playback::{
        state::GameState,
        sync::{LocalPlayerSync, MediaPlayer, PlaybackRequester},
    },
};

/// Incremental `text/event-stream` parser.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed raw bytes and collect every event completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_owned()),
                "data" => self.data.push(value.to_owned()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent { event, data })
    }
}

/// Stream the shared playback document of session `code`, starting with its current value.
pub fn subscribe_state(
    http: reqwest::Client,
    base_url: &str,
    code: &str,
) -> impl Stream<Item = ClientResult<GameState>> + Send + 'static {
    let url = format!("{}/api/sessions/{code}/events", base_url.trim_end_matches('/'));
    async_stream::try_stream! {
        let response = http.get(&url).header(ACCEPT, "text/event-stream").send().await?;
        if !response.status().is_success() {
            let err = status_error(response).await;
            Err::<(), ClientError>(err)?;
            return;
        }

        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                if event.event.as_deref() == Some(GAME_STATE_EVENT) {
                    let state: GameState = serde_json::from_str(&event.data)?;
                    yield state;
                }
            }
        }
    }
}

/// Feed every received state into `sync` until the stream ends or fails.
pub async fn follow<S, P, R>(states: S, sync: &LocalPlayerSync<P, R>) -> Result<(), ClientError>
where
    S: Stream<Item = ClientResult<GameState>>,
    P: MediaPlayer,
    R: PlaybackRequester,
{
    futures::pin_mut!(states);
    while let Some(state) = states.next().await {
        match state {
            Ok(state) => {
                debug!(phase = ?state.playback_state, "shared state received");
                sync.on_shared_state(&state);
            }
            Err(err) => {
                warn!(error = %err, "session event stream failed");
                return Err(err);
            }
        }
    }
    Ok(())
}
