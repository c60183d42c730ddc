//! Proxy for the YouTube Data API search endpoint; keeps the API key on the server.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    config::SearchSettings, dto::search::SearchResult, dto::validation::YOUTUBE_WATCH_PREFIX,
    error::ServiceError, state::SharedState,
};

const QUOTA_EXCEEDED: &str = "YouTube API quota exceeded. Please try again later.";

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

fn into_results(response: SearchListResponse) -> Vec<SearchResult> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            Some(SearchResult {
                url: format!("{YOUTUBE_WATCH_PREFIX}{video_id}"),
                video_id,
                title: item.snippet.title,
                thumbnail: item.snippet.thumbnails.default.map(|thumb| thumb.url),
            })
        })
        .collect()
}

/// Map an error body of the API to the error surfaced to clients.
fn classify_error(body: &str) -> ServiceError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            if error
                .errors
                .iter()
                .any(|detail| detail.reason.as_deref() == Some("quotaExceeded"))
            {
                ServiceError::QuotaExceeded(QUOTA_EXCEEDED.into())
            } else {
                ServiceError::Upstream(format!(
                    "YouTube API error: {}",
                    error.message.as_deref().unwrap_or("Unknown error")
                ))
            }
        }
        Err(_) => ServiceError::Upstream("Error searching YouTube".into()),
    }
}

async fn query_api(
    http: &reqwest::Client,
    settings: &SearchSettings,
    key: &str,
    term: &str,
) -> Result<Vec<SearchResult>, ServiceError> {
    let max_results = settings.max_results.to_string();
    let response = http
        .get(&settings.api_base_url)
        .query(&[
            ("part", "snippet"),
            ("q", term),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("videoCategoryId", settings.video_category_id.as_str()),
            ("key", key),
        ])
        .send()
        .await
        .map_err(|err| {
            warn!(error = %err, "YouTube search request failed");
            ServiceError::Upstream("Error searching YouTube".into())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(%status, %body, "YouTube search rejected");
        return Err(classify_error(&body));
    }

    let parsed = response.json::<SearchListResponse>().await.map_err(|err| {
        warn!(error = %err, "unexpected YouTube search payload");
        ServiceError::Upstream("Error searching YouTube".into())
    })?;
    Ok(into_results(parsed))
}

/// Search YouTube for `q`; 400 when the term is blank.
pub async fn search(state: &SharedState, q: Option<&str>) -> Result<Vec<SearchResult>, ServiceError> {
    let term = q.map(str::trim).filter(|term| !term.is_empty()).ok_or_else(|| {
        ServiceError::InvalidInput("Missing search query parameter \"q\"".into())
    })?;
    let config = state.config();
    let key = config.youtube_api_key.as_deref().ok_or_else(|| {
        ServiceError::Internal("Server configuration error: YouTube API key missing".into())
    })?;

    let results = query_api(state.http(), &config.search, key, term).await?;
    debug!(term, count = results.len(), "YouTube search answered");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn items_map_to_watch_urls() {
        let response: SearchListResponse = serde_json::from_value(json!({
            "items": [
                {
                    "id": { "kind": "youtube#video", "videoId": "abc123" },
                    "snippet": {
                        "title": "Song",
                        "thumbnails": { "default": { "url": "https://i.ytimg.com/vi/abc123/default.jpg" } }
                    }
                },
                { "id": { "kind": "youtube#channel" }, "snippet": { "title": "Channel" } }
            ]
        }))
        .unwrap();

        let results = into_results(response);
        assert_eq!(
            results,
            [SearchResult {
                video_id: "abc123".into(),
                title: "Song".into(),
                thumbnail: Some("https://i.ytimg.com/vi/abc123/default.jpg".into()),
                url: "https://www.youtube.com/watch?v=abc123".into(),
            }]
        );
    }

    #[test]
    fn quota_errors_are_recognised() {
        let body = json!({
            "error": { "message": "quota", "errors": [{ "reason": "quotaExceeded" }] }
        })
        .to_string();
        assert!(matches!(classify_error(&body), ServiceError::QuotaExceeded(m) if m == QUOTA_EXCEEDED));
    }

    #[test]
    fn other_errors_carry_the_api_message() {
        let body = json!({ "error": { "message": "Bad key", "errors": [{ "reason": "keyInvalid" }] } })
            .to_string();
        match classify_error(&body) {
            ServiceError::Upstream(message) => assert_eq!(message, "YouTube API error: Bad key"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(classify_error("<html>"), ServiceError::Upstream(_)));
    }

    #[tokio::test]
    async fn missing_term_or_key_is_rejected() {
        use crate::{config::AppConfig, state::AppState};

        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            search(&state, Some("   ")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            search(&state, Some("queen")).await,
            Err(ServiceError::Internal(_))
        ));
    }
}
