pub mod health;
pub mod player_handler;
pub mod settlement_handler;

use crate::service::{HistoryService, LedgerService, PlayerService, TransferClient};
use actix_web::web;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState {
    pub players: Arc<PlayerService>,
    pub ledger: Arc<LedgerService<TransferClient>>,
    pub history: Arc<HistoryService>,
}

/// Settlement API surface.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/players")
                    .route("", web::post().to(player_handler::get_or_create_player))
                    .route("/{wallet}", web::get().to(player_handler::get_player))
                    .route(
                        "/{wallet}/history",
                        web::get().to(player_handler::list_history),
                    )
                    .route(
                        "/{wallet}/results",
                        web::post().to(settlement_handler::submit_result),
                    )
                    .route(
                        "/{wallet}/withdrawals",
                        web::post().to(settlement_handler::withdraw),
                    )
                    .route(
                        "/{wallet}/withdrawals/unresolved",
                        web::get().to(settlement_handler::list_unresolved_withdrawals),
                    ),
            ),
    );
}
