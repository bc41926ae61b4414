use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a withdrawal. `Unknown` marks an attempt whose on-chain
/// outcome could not be confirmed; it is parked for manual reconciliation
/// and must never be retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "withdrawal_status", rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Succeeded,
    Failed,
    Unknown,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Succeeded => write!(f, "succeeded"),
            WithdrawalStatus::Failed => write!(f, "failed"),
            WithdrawalStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Audit row for one withdrawal request, keyed by the client-supplied
/// idempotency `request_id`. The balance is debited only on the transition
/// to `Succeeded`, never optimistically.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WithdrawalAttempt {
    pub id: Uuid,
    pub request_id: String,
    pub wallet_address: String,
    pub amount: i64,
    pub status: WithdrawalStatus,
    pub tx_hash: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl WithdrawalAttempt {
    pub fn is_settled(&self) -> bool {
        matches!(self.status, WithdrawalStatus::Succeeded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WithdrawRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    /// Client-supplied idempotency key; replays of the same key never issue
    /// a second transfer.
    #[validate(length(min = 1, max = 128))]
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalReceipt {
    pub request_id: String,
    pub status: WithdrawalStatus,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Player balance after the debit.
    pub balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_status_serialization() {
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Failed).unwrap(),
            "\"failed\""
        );
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn test_withdraw_request_validation() {
        let req = WithdrawRequest {
            amount: 500,
            request_id: "wd-001".to_string(),
        };
        assert!(req.validate().is_ok());

        let zero = WithdrawRequest {
            amount: 0,
            request_id: "wd-002".to_string(),
        };
        assert!(zero.validate().is_err());

        let negative = WithdrawRequest {
            amount: -5,
            request_id: "wd-003".to_string(),
        };
        assert!(negative.validate().is_err());

        let blank_key = WithdrawRequest {
            amount: 500,
            request_id: String::new(),
        };
        assert!(blank_key.validate().is_err());
    }

    #[test]
    fn test_is_settled_only_on_succeeded() {
        let mut attempt = WithdrawalAttempt {
            id: Uuid::new_v4(),
            request_id: "wd-001".to_string(),
            wallet_address: "w1".to_string(),
            amount: 500,
            status: WithdrawalStatus::Pending,
            tx_hash: None,
            note: None,
            created_at: Utc::now(),
            settled_at: None,
        };
        assert!(!attempt.is_settled());
        attempt.status = WithdrawalStatus::Unknown;
        assert!(!attempt.is_settled());
        attempt.status = WithdrawalStatus::Succeeded;
        assert!(attempt.is_settled());
    }

    #[test]
    fn test_receipt_omits_missing_tx_hash() {
        let receipt = WithdrawalReceipt {
            request_id: "wd-001".to_string(),
            status: WithdrawalStatus::Failed,
            amount: 500,
            tx_hash: None,
            balance: 500,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        assert!(!json.contains("tx_hash"));
    }
}
