use crate::api_error::ApiError;
use crate::http::AppState;
use crate::models::game_record::HistoryQuery;
use crate::models::player::{CreatePlayerRequest, PlayerResponse};
use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use validator::Validate;

/// POST /api/players
/// Get-or-create the ledger row for a wallet.
pub async fn get_or_create_player(
    state: web::Data<AppState>,
    req: web::Json<CreatePlayerRequest>,
) -> Result<impl Responder, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    info!(wallet = %req.wallet_address, "Received get-or-create player request");

    let player = state.players.get_or_create(&req.wallet_address).await?;

    Ok(HttpResponse::Ok().json(PlayerResponse::from(player)))
}

/// GET /api/players/:wallet
pub async fn get_player(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let wallet = path.into_inner();

    let player = state.players.get(&wallet).await?;

    Ok(HttpResponse::Ok().json(PlayerResponse::from(player)))
}

/// GET /api/players/:wallet/history?cursor=&limit=
/// Settled games for a wallet, newest first, keyset-paginated.
pub async fn list_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, ApiError> {
    let wallet = path.into_inner();

    let page = state
        .history
        .list_by_player(&wallet, query.cursor, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_player_request_deserialization() {
        let json = r#"{"wallet_address":"9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"}"#;
        let req: CreatePlayerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.wallet_address,
            "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"
        );
    }

    #[test]
    fn test_history_query_deserialization() {
        let query: HistoryQuery =
            serde_json::from_str(r#"{"cursor":42,"limit":10}"#).unwrap();
        assert_eq!(query.cursor, Some(42));
        assert_eq!(query.limit, Some(10));

        let empty: HistoryQuery = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(empty.cursor, None);
        assert_eq!(empty.limit, None);
    }
}
