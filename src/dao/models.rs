use serde::{Deserialize, Serialize};

/// `sessions/{code}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    /// Commit time in epoch milliseconds; zero when absent.
    #[serde(default)]
    pub created_at: i64,
}

/// `sessions/{code}/songs/{id}` and the global `songs/{id}` library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongEntity {
    /// Watch URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Commit time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

/// `sessions/{code}/players/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    /// Name as entered.
    pub name: String,
    /// Lower-cased name used for the per-session uniqueness check.
    pub name_lower: String,
    /// Current score, never negative.
    #[serde(default)]
    pub score: i64,
    /// Commit time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

/// A decoded document together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Last segment of the document path.
    pub id: String,
    /// Decoded fields.
    pub value: T,
}
