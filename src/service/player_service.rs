use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::player::{validate_wallet_address, Player};
use tracing::info;

const PLAYER_COLUMNS: &str = "wallet_address, wins, losses, ties, balance, version, created_at";

/// Read/create access to player rows. Counter and balance mutation lives
/// exclusively in the ledger service.
pub struct PlayerService {
    pool: DbPool,
}

impl PlayerService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Return the player for a wallet, creating the row on first sight.
    /// Concurrent calls for the same wallet race on the insert; the loser
    /// of the race reads the winner's row instead of failing.
    pub async fn get_or_create(&self, wallet_address: &str) -> Result<Player, ApiError> {
        validate_wallet_address(wallet_address)?;

        let inserted = sqlx::query(
            "INSERT INTO players (wallet_address) VALUES ($1) \
             ON CONFLICT (wallet_address) DO NOTHING",
        )
        .bind(wallet_address)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!(wallet = wallet_address, "Created player record");
        }

        self.get(wallet_address).await
    }

    pub async fn get(&self, wallet_address: &str) -> Result<Player, ApiError> {
        validate_wallet_address(wallet_address)?;

        sqlx::query_as(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE wallet_address = $1"
        ))
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Player not found"))
    }
}
