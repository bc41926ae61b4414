use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Classification of a completed game for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Tie => write!(f, "tie"),
        }
    }
}

/// One settled game. Inserted in the same transaction as the player update
/// it describes; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameRecord {
    pub id: i64,
    pub wallet_address: String,
    pub outcome: Outcome,
    pub wager_delta: i64,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    pub outcome: Outcome,
    pub wager_delta: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    /// Keyset cursor: the `id` of the last record on the previous page.
    pub cursor: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub records: Vec<GameRecord>,
    /// Present when another page may exist; pass back as `cursor`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
}
