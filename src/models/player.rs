use crate::api_error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const MAX_WALLET_ADDRESS_LEN: usize = 128;

/// Ledger row for one player, keyed by wallet address. Counters and balance
/// are written only by the ledger service; `version` increases with every
/// write so consumers can detect stale snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub wallet_address: String,
    pub wins: i64,
    pub losses: i64,
    pub ties: i64,
    /// Smallest currency unit (lamports); never negative.
    pub balance: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePlayerRequest {
    #[validate(length(min = 1, max = 128))]
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub wallet_address: String,
    pub wins: i64,
    pub losses: i64,
    pub ties: i64,
    pub balance: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Player> for PlayerResponse {
    fn from(player: Player) -> Self {
        Self {
            wallet_address: player.wallet_address,
            wins: player.wins,
            losses: player.losses,
            ties: player.ties,
            balance: player.balance,
            version: player.version,
            created_at: player.created_at,
        }
    }
}

/// Wallet addresses are opaque, case-sensitive identifiers supplied by an
/// upstream identity provider. The ledger only rejects shapes that cannot
/// be a wallet at all.
pub fn validate_wallet_address(address: &str) -> Result<(), ApiError> {
    if address.is_empty() {
        return Err(ApiError::bad_request("Wallet address must not be empty"));
    }
    if address.len() > MAX_WALLET_ADDRESS_LEN {
        return Err(ApiError::bad_request("Wallet address too long"));
    }
    if address.chars().any(|c| c.is_whitespace()) {
        return Err(ApiError::bad_request(
            "Wallet address must not contain whitespace",
        ));
    }
    Ok(())
}
