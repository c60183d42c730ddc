use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{PlayerEntity, Record};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Player as shown on the scoreboard.
pub struct PlayerView {
    /// Store-assigned player id.
    pub id: String,
    /// Display name as entered.
    pub name: String,
    /// Never negative.
    pub score: i64,
}

impl From<Record<PlayerEntity>> for PlayerView {
    fn from(record: Record<PlayerEntity>) -> Self {
        Self {
            id: record.id,
            name: record.value.name,
            score: record.value.score,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
/// Body of `POST /api/sessions/{code}/players`; the name is trimmed before use.
pub struct AddPlayerRequest {
    /// Requested display name; must be unique within the session, ignoring case.
    #[serde(default)]
    #[validate(length(max = 64, message = "Player name is too long"))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Relative score change; the stored score never drops below zero.
pub struct ScoreDeltaRequest {
    /// Points to add; negative values subtract.
    pub delta: i64,
}
