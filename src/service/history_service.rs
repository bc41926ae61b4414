use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::game_record::{GameRecord, HistoryPage};
use crate::models::player::validate_wallet_address;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Keyset cursor for the next page: the id of the last record returned,
/// or None when the page came back short (no further records can exist).
fn next_cursor(records: &[GameRecord], limit: i64) -> Option<i64> {
    if (records.len() as i64) < limit {
        return None;
    }
    records.last().map(|r| r.id)
}

/// Read access to the append-only game history. Appends happen only inside
/// the ledger service's settlement transaction.
pub struct HistoryService {
    pool: DbPool,
}

impl HistoryService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Page through a player's settled games, newest first. Keyset
    /// pagination on `id` means consecutive pages never skip or duplicate
    /// a record while no new record is appended in between.
    pub async fn list_by_player(
        &self,
        wallet_address: &str,
        cursor: Option<i64>,
        limit: Option<i64>,
    ) -> Result<HistoryPage, ApiError> {
        validate_wallet_address(wallet_address)?;

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT 1::BIGINT FROM players WHERE wallet_address = $1")
                .bind(wallet_address)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(ApiError::not_found("Player not found"));
        }

        let limit = clamp_limit(limit);

        let records: Vec<GameRecord> = sqlx::query_as(
            "SELECT id, wallet_address, outcome, wager_delta, played_at \
             FROM game_records \
             WHERE wallet_address = $1 AND ($2::BIGINT IS NULL OR id < $2) \
             ORDER BY id DESC \
             LIMIT $3",
        )
        .bind(wallet_address)
        .bind(cursor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let next_cursor = next_cursor(&records, limit);

        Ok(HistoryPage {
            records,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_record::Outcome;
    use chrono::Utc;

    fn record(id: i64) -> GameRecord {
        GameRecord {
            id,
            wallet_address: "w1".to_string(),
            outcome: Outcome::Win,
            wager_delta: 100,
            played_at: Utc::now(),
        }
    }

    #[test]
    fn test_clamp_limit_defaults_and_bounds() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_next_cursor_present_on_full_page() {
        let records: Vec<GameRecord> = (0..3i64).map(|i| record(30 - i)).collect();
        assert_eq!(next_cursor(&records, 3), Some(28));
    }

    #[test]
    fn test_next_cursor_absent_on_short_page() {
        let records: Vec<GameRecord> = (0..2i64).map(|i| record(30 - i)).collect();
        assert_eq!(next_cursor(&records, 3), None);
        assert_eq!(next_cursor(&[], 3), None);
    }
}
