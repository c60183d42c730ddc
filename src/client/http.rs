//! Playback calls over HTTP.

use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    client::error::{ClientError, ClientResult},
    dto::playback::PlaybackResponse,
    playback::{state::GameStateUpdate, sync::PlaybackRequester},
};

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Error carried by a non-success response, preferring the `{message}` body.
pub(crate) async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|error| error.message)
        .unwrap_or(body);
    ClientError::Status { status, message }
}

/// Playback endpoints of one session.
#[derive(Clone)]
pub struct HttpPlaybackClient {
    http: reqwest::Client,
    base_url: String,
    code: String,
}

impl HttpPlaybackClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            http,
            base_url: Into::<String>::into(base_url).trim_end_matches('/').to_owned(),
            code: code.into(),
        }
    }

    /// Session this client talks to.
    pub fn code(&self) -> &str {
        &self.code
    }

    fn playback_url(&self, action: &str) -> String {
        format!("{}/api/sessions/{}/playback/{action}", self.base_url, self.code)
    }

    fn send<T: Serialize>(
        &self,
        request: reqwest::RequestBuilder,
        body: Option<&T>,
    ) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(status_error(response).await);
            }
            Ok(response.json::<PlaybackResponse>().await?)
        }
        .boxed()
    }

    fn post(
        &self,
        action: &str,
        body: Option<serde_json::Value>,
    ) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        self.send(self.http.post(self.playback_url(action)), body.as_ref())
    }

    /// Ask for the next unplayed song, or any song with `force_reset`.
    pub fn next_song(&self, force_reset: bool) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        self.post("next", Some(json!({ "forceResetPlayedIds": force_reset })))
    }

    /// Reveal the current title.
    pub fn reveal(&self) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        self.post("reveal", None)
    }

    /// Pause every player.
    pub fn pause(&self) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        self.post("pause", None)
    }

    /// Start the game; pass [`PlaybackResponse::first_snippet_url`] to
    /// [`LocalPlayerSync::arm_autoplay`](crate::playback::sync::LocalPlayerSync::arm_autoplay).
    pub fn start(&self) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        self.post("start", None)
    }

    /// Restart the round; arm autoplay from the response like [`Self::start`].
    pub fn restart(&self) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        self.post("restart", None)
    }

    /// Raw partial write of the shared state.
    pub fn update_state(
        &self,
        update: &GameStateUpdate,
    ) -> BoxFuture<'static, ClientResult<PlaybackResponse>> {
        let url = format!("{}/api/sessions/{}/state", self.base_url, self.code);
        self.send(self.http.patch(url), Some(update))
    }
}

fn discard(call: BoxFuture<'static, ClientResult<PlaybackResponse>>) -> BoxFuture<'static, ClientResult<()>> {
    call.map(|result| result.map(|_| ())).boxed()
}

impl PlaybackRequester for HttpPlaybackClient {
    fn play_snippet(&self, duration: f64) -> BoxFuture<'static, ClientResult<()>> {
        discard(self.post("snippet", Some(json!({ "duration": duration }))))
    }

    fn play_more(&self, position: f64, duration: f64) -> BoxFuture<'static, ClientResult<()>> {
        discard(self.post(
            "more",
            Some(json!({ "position": position, "duration": duration })),
        ))
    }

    fn snippet_elapsed(&self) -> BoxFuture<'static, ClientResult<()>> {
        discard(self.post("elapsed", None))
    }

    fn media_ended(&self) -> BoxFuture<'static, ClientResult<()>> {
        discard(self.post("ended", None))
    }

    fn report_error(&self, message: String) -> BoxFuture<'static, ClientResult<()>> {
        discard(self.post("error", Some(json!({ "message": message }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_the_trimmed_base() {
        let client = HttpPlaybackClient::new(reqwest::Client::new(), "http://localhost:5000/", "123456");
        assert_eq!(
            client.playback_url("snippet"),
            "http://localhost:5000/api/sessions/123456/playback/snippet"
        );
        assert_eq!(client.code(), "123456");
    }
}
