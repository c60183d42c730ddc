use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
/// Query string of the search proxy.
pub struct SearchQuery {
    /// Free-text search term.
    pub q: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// One video returned by the search proxy.
pub struct SearchResult {
    /// YouTube video id.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Default thumbnail URL, when the API returns one.
    pub thumbnail: Option<String>,
    /// Watch URL built from the video id.
    pub url: String,
}
