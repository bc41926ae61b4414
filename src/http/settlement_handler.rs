use crate::api_error::ApiError;
use crate::http::AppState;
use crate::models::game_record::SubmitResultRequest;
use crate::models::player::PlayerResponse;
use crate::models::withdrawal::WithdrawRequest;
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use validator::Validate;

/// POST /api/players/:wallet/results
/// Settle one completed game against the player's ledger.
pub async fn submit_result(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<SubmitResultRequest>,
) -> Result<impl Responder, ApiError> {
    let wallet = path.into_inner();

    info!(
        wallet = %wallet,
        outcome = %req.outcome,
        wager_delta = req.wager_delta,
        "Received game result"
    );

    let player = state
        .ledger
        .record_outcome(&wallet, req.outcome, req.wager_delta)
        .await?;

    Ok(HttpResponse::Ok().json(PlayerResponse::from(player)))
}

/// POST /api/players/:wallet/withdrawals
/// Pay out part of the player's balance to their wallet. The response
/// `retryable` flag on errors distinguishes "no effect, retry" from
/// "funds may have moved, do not retry".
pub async fn withdraw(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<WithdrawRequest>,
) -> Result<impl Responder, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let wallet = path.into_inner();

    info!(
        wallet = %wallet,
        amount = req.amount,
        request_id = %req.request_id,
        "Received withdrawal request"
    );

    let receipt = state
        .ledger
        .withdraw(&wallet, req.amount, &req.request_id)
        .await?;

    Ok(HttpResponse::Ok().json(receipt))
}

/// GET /api/players/:wallet/withdrawals/unresolved
/// Attempts parked for manual reconciliation.
pub async fn list_unresolved_withdrawals(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let wallet = path.into_inner();

    let attempts = state.ledger.list_unresolved(&wallet).await?;

    Ok(HttpResponse::Ok().json(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_record::Outcome;

    #[test]
    fn test_submit_result_request_deserialization() {
        let json = r#"{"outcome":"win","wager_delta":500}"#;
        let req: SubmitResultRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.outcome, Outcome::Win);
        assert_eq!(req.wager_delta, 500);
    }

    #[test]
    fn test_submit_result_rejects_unknown_outcome() {
        let json = r#"{"outcome":"forfeit","wager_delta":0}"#;
        let result: Result<SubmitResultRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_withdraw_request_deserialization() {
        let json = r#"{"amount":500,"request_id":"wd-2024-001"}"#;
        let req: WithdrawRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount, 500);
        assert_eq!(req.request_id, "wd-2024-001");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_withdraw_request_requires_request_id() {
        let json = r#"{"amount":500}"#;
        let result: Result<WithdrawRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
