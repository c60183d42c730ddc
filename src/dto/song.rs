use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{Record, SongEntity};

use super::{
    format_timestamp_millis,
    validation::{validate_session_code, validate_youtube_url},
};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Song as listed to clients.
pub struct SongView {
    /// Store-assigned song id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// YouTube URL.
    pub url: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<Record<SongEntity>> for SongView {
    fn from(record: Record<SongEntity>) -> Self {
        Self {
            id: record.id,
            title: record.value.title,
            url: record.value.url,
            created_at: format_timestamp_millis(record.value.created_at),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Body of the add-song endpoints. Without `sessionCode` the song goes to the global library.
pub struct AddSongRequest {
    /// Display title.
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    /// YouTube URL; must carry a recognisable video id.
    #[serde(default)]
    #[validate(custom(function = "validate_youtube_url"))]
    pub url: String,
    /// Target session, when the song is not for the library.
    #[serde(default)]
    #[validate(custom(function = "validate_session_code"))]
    pub session_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Echo of a stored song.
pub struct AddSongResponse {
    /// Store-assigned song id.
    pub id: String,
    /// Stored title.
    pub title: String,
    /// Stored URL.
    pub url: String,
}

impl From<Record<SongEntity>> for AddSongResponse {
    fn from(record: Record<SongEntity>) -> Self {
        Self {
            id: record.id,
            title: record.value.title,
            url: record.value.url,
        }
    }
}
