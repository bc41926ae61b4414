//! The ledger service is the sole writer of player counters and balance.
//!
//! Game settlement commits the counter bump, the balance change, and the
//! history record in one database transaction. Withdrawals debit the
//! balance with a conditional single-statement update, and only after the
//! external transfer collaborator has confirmed; the external call is never
//! made while holding a row lock or an open transaction.

use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::player::{validate_wallet_address, Player};
use crate::models::{
    Outcome, WithdrawalAttempt, WithdrawalReceipt, WithdrawalStatus,
};
use crate::service::transfer_service::{TransferApi, TransferOutcome};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const PLAYER_COLUMNS: &str = "wallet_address, wins, losses, ties, balance, version, created_at";

/// Balance after applying a signed wager delta. Draining to exactly zero is
/// allowed; going below zero is not.
fn settled_balance(balance: i64, wager_delta: i64) -> Result<i64, ApiError> {
    let next = balance
        .checked_add(wager_delta)
        .ok_or_else(|| ApiError::bad_request("Wager delta overflows balance"))?;
    if next < 0 {
        return Err(ApiError::insufficient_balance(
            balance,
            wager_delta.checked_abs().unwrap_or(i64::MAX),
        ));
    }
    Ok(next)
}

/// One-hot counter increments for an outcome.
fn counter_increments(outcome: Outcome) -> (i64, i64, i64) {
    match outcome {
        Outcome::Win => (1, 0, 0),
        Outcome::Loss => (0, 1, 0),
        Outcome::Tie => (0, 0, 1),
    }
}

pub struct LedgerService<T: TransferApi> {
    pool: DbPool,
    transfer: Arc<T>,
}

impl<T: TransferApi> LedgerService<T> {
    pub fn new(pool: DbPool, transfer: Arc<T>) -> Self {
        Self { pool, transfer }
    }

    /// Settle one completed game: bump the matching counter, apply the
    /// wager delta, append the history record. All three land in one
    /// transaction or none do.
    pub async fn record_outcome(
        &self,
        wallet_address: &str,
        outcome: Outcome,
        wager_delta: i64,
    ) -> Result<Player, ApiError> {
        validate_wallet_address(wallet_address)?;

        let mut tx = self.pool.begin().await?;

        // Get-or-create, so the first settled game for a wallet also
        // creates its ledger row.
        sqlx::query(
            "INSERT INTO players (wallet_address) VALUES ($1) \
             ON CONFLICT (wallet_address) DO NOTHING",
        )
        .bind(wallet_address)
        .execute(&mut *tx)
        .await?;

        // Row lock serializes concurrent settlements for the same player.
        let player: Player = sqlx::query_as(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE wallet_address = $1 FOR UPDATE"
        ))
        .bind(wallet_address)
        .fetch_one(&mut *tx)
        .await?;

        let new_balance = settled_balance(player.balance, wager_delta)?;
        let (wins, losses, ties) = counter_increments(outcome);

        let updated: Player = sqlx::query_as(&format!(
            "UPDATE players \
             SET wins = wins + $2, losses = losses + $3, ties = ties + $4, \
                 balance = $5, version = version + 1 \
             WHERE wallet_address = $1 \
             RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(wallet_address)
        .bind(wins)
        .bind(losses)
        .bind(ties)
        .bind(new_balance)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO game_records (wallet_address, outcome, wager_delta) \
             VALUES ($1, $2, $3)",
        )
        .bind(wallet_address)
        .bind(outcome)
        .bind(wager_delta)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            wallet = wallet_address,
            outcome = %outcome,
            wager_delta = wager_delta,
            balance = updated.balance,
            version = updated.version,
            "Game outcome settled"
        );

        Ok(updated)
    }

    /// Process a withdrawal. The balance is debited only after the transfer
    /// collaborator confirms, via a conditional update that re-checks the
    /// balance at commit time.
    pub async fn withdraw(
        &self,
        wallet_address: &str,
        amount: i64,
        request_id: &str,
    ) -> Result<WithdrawalReceipt, ApiError> {
        validate_wallet_address(wallet_address)?;
        if amount <= 0 {
            return Err(ApiError::bad_request(
                "Withdrawal amount must be positive",
            ));
        }
        if request_id.is_empty() {
            return Err(ApiError::bad_request("request_id must not be empty"));
        }

        let player = self.fetch_player(wallet_address).await?;
        if amount > player.balance {
            return Err(ApiError::insufficient_balance(player.balance, amount));
        }

        // Claim the idempotency key before anything leaves the building.
        // The claim is a single guarded upsert, so of any number of
        // concurrent requests sharing a request_id exactly one proceeds to
        // the transfer; the rest fall through to the replay path.
        if !self.claim_attempt(request_id, wallet_address, amount).await? {
            return self.replay_attempt(request_id, wallet_address).await;
        }

        info!(
            wallet = wallet_address,
            amount = amount,
            request_id = request_id,
            "Invoking transfer collaborator"
        );

        // No row lock or open transaction across the external call.
        let outcome = self
            .transfer
            .transfer(wallet_address, amount, request_id)
            .await;

        match outcome {
            Ok(TransferOutcome::Confirmed { tx_hash }) => {
                self.settle_confirmed(wallet_address, amount, request_id, &tx_hash)
                    .await
            }
            Ok(TransferOutcome::Failed { reason }) => {
                self.mark_attempt(request_id, WithdrawalStatus::Failed, None, Some(&reason))
                    .await?;
                warn!(
                    request_id = request_id,
                    reason = reason,
                    "Transfer failed; balance untouched"
                );
                Err(ApiError::TransferFailed(reason))
            }
            Ok(TransferOutcome::Ambiguous { reason }) => {
                self.mark_attempt(request_id, WithdrawalStatus::Unknown, None, Some(&reason))
                    .await?;
                warn!(
                    request_id = request_id,
                    reason = reason,
                    "Transfer outcome ambiguous; flagged for reconciliation"
                );
                Err(ApiError::TransferAmbiguous(reason))
            }
            Err(e) => {
                // Pre-submission error: nothing reached the network.
                let reason = e.to_string();
                self.mark_attempt(request_id, WithdrawalStatus::Failed, None, Some(&reason))
                    .await?;
                warn!(
                    request_id = request_id,
                    error = reason,
                    "Transfer submission failed; balance untouched"
                );
                Err(ApiError::TransferFailed(reason))
            }
        }
    }

    /// Debit after a confirmed transfer. The conditional update re-checks
    /// the balance, so a concurrent operation can never drive it negative.
    async fn settle_confirmed(
        &self,
        wallet_address: &str,
        amount: i64,
        request_id: &str,
        tx_hash: &str,
    ) -> Result<WithdrawalReceipt, ApiError> {
        let debited: Option<(i64,)> = sqlx::query_as(
            "UPDATE players \
             SET balance = balance - $2, version = version + 1 \
             WHERE wallet_address = $1 AND balance >= $2 \
             RETURNING balance",
        )
        .bind(wallet_address)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        match debited {
            Some((balance,)) => {
                self.mark_attempt(
                    request_id,
                    WithdrawalStatus::Succeeded,
                    Some(tx_hash),
                    None,
                )
                .await?;
                info!(
                    wallet = wallet_address,
                    amount = amount,
                    request_id = request_id,
                    tx_hash = tx_hash,
                    balance = balance,
                    "Withdrawal settled"
                );
                Ok(WithdrawalReceipt {
                    request_id: request_id.to_string(),
                    status: WithdrawalStatus::Succeeded,
                    amount,
                    tx_hash: Some(tx_hash.to_string()),
                    balance,
                })
            }
            None => {
                // Funds left the treasury but the ledger balance moved
                // underneath us. Park for manual reconciliation; the ledger
                // must never go negative and must never drop the record.
                let note = format!(
                    "transfer {} confirmed but conditional debit of {} found insufficient balance",
                    tx_hash, amount
                );
                self.mark_attempt(
                    request_id,
                    WithdrawalStatus::Unknown,
                    Some(tx_hash),
                    Some(&note),
                )
                .await?;
                error!(
                    wallet = wallet_address,
                    amount = amount,
                    request_id = request_id,
                    tx_hash = tx_hash,
                    "Confirmed transfer could not be debited; manual reconciliation required"
                );
                Err(ApiError::TransferAmbiguous(note))
            }
        }
    }

    /// Atomically claim a request_id for this withdrawal. Inserts the
    /// attempt, or re-arms an existing one only if it failed cleanly and
    /// belongs to the same wallet. Returns false when the key is already
    /// held: settled, in flight, awaiting reconciliation, or foreign — the
    /// guard never fires for those, so a replay can neither issue a second
    /// transfer nor erase the tx_hash of a settled attempt.
    async fn claim_attempt(
        &self,
        request_id: &str,
        wallet_address: &str,
        amount: i64,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "INSERT INTO withdrawal_attempts (id, request_id, wallet_address, amount) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (request_id) DO UPDATE \
             SET status = 'pending', amount = EXCLUDED.amount, \
                 tx_hash = NULL, note = NULL, settled_at = NULL \
             WHERE withdrawal_attempts.status = 'failed' \
               AND withdrawal_attempts.wallet_address = EXCLUDED.wallet_address",
        )
        .bind(Uuid::new_v4())
        .bind(request_id)
        .bind(wallet_address)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The request_id was already claimed; report the stored outcome
    /// without touching the transfer collaborator or the balance.
    async fn replay_attempt(
        &self,
        request_id: &str,
        wallet_address: &str,
    ) -> Result<WithdrawalReceipt, ApiError> {
        let existing = self.get_attempt(request_id).await?.ok_or_else(|| {
            ApiError::conflict(format!("Withdrawal {} could not be claimed", request_id))
        })?;

        if existing.wallet_address != wallet_address {
            return Err(ApiError::conflict(format!(
                "request_id {} already used by another wallet",
                request_id
            )));
        }

        if existing.is_settled() {
            info!(
                request_id = request_id,
                "Replayed withdrawal already succeeded; returning stored receipt"
            );
            let player = self.fetch_player(wallet_address).await?;
            return Ok(WithdrawalReceipt {
                request_id: existing.request_id,
                status: existing.status,
                amount: existing.amount,
                tx_hash: existing.tx_hash,
                balance: player.balance,
            });
        }

        match existing.status {
            // Lost the claim to a concurrent attempt that itself failed in
            // the meantime; nothing was re-issued, the caller may retry.
            WithdrawalStatus::Failed => Err(ApiError::TransferFailed(format!(
                "withdrawal {} failed in a concurrent attempt; safe to retry",
                request_id
            ))),
            _ => Err(ApiError::conflict(format!(
                "Withdrawal {} is in flight or awaiting reconciliation; do not retry",
                request_id
            ))),
        }
    }

    /// Withdrawal attempts awaiting manual reconciliation for one player.
    pub async fn list_unresolved(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<WithdrawalAttempt>, ApiError> {
        validate_wallet_address(wallet_address)?;
        let attempts = sqlx::query_as(
            "SELECT id, request_id, wallet_address, amount, status, tx_hash, note, \
                    created_at, settled_at \
             FROM withdrawal_attempts \
             WHERE wallet_address = $1 AND status = 'unknown' \
             ORDER BY created_at ASC",
        )
        .bind(wallet_address)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn get_attempt(
        &self,
        request_id: &str,
    ) -> Result<Option<WithdrawalAttempt>, ApiError> {
        let attempt = sqlx::query_as(
            "SELECT id, request_id, wallet_address, amount, status, tx_hash, note, \
                    created_at, settled_at \
             FROM withdrawal_attempts \
             WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn mark_attempt(
        &self,
        request_id: &str,
        status: WithdrawalStatus,
        tx_hash: Option<&str>,
        note: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE withdrawal_attempts \
             SET status = $2, tx_hash = $3, note = $4, settled_at = now() \
             WHERE request_id = $1",
        )
        .bind(request_id)
        .bind(status)
        .bind(tx_hash)
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_player(&self, wallet_address: &str) -> Result<Player, ApiError> {
        sqlx::query_as(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE wallet_address = $1"
        ))
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Player not found"))
    }
}
