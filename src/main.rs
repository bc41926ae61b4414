use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tokio::signal;

mod api_error;
mod config;
mod db;
mod http;
mod middleware;
mod models;
mod service;
mod telemetry;

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::http::AppState;
use crate::middleware::cors_middleware;
use crate::service::{HistoryService, LedgerService, PlayerService, TransferClient};
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().expect("Failed to load configuration");

    init_telemetry(&config.server.rust_log);

    let db_pool = create_pool(&config)
        .await
        .expect("Failed to create database pool");

    run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let transfer_client = Arc::new(TransferClient::new(config.transfer.clone()));
    let players = Arc::new(PlayerService::new(db_pool.clone()));
    let ledger = Arc::new(LedgerService::new(db_pool.clone(), transfer_client));
    let history = Arc::new(HistoryService::new(db_pool.clone()));

    tracing::info!(
        "Starting settlement backend on {}:{}",
        config.server.host,
        config.server.port
    );

    let state = web::Data::new(AppState {
        players,
        ledger,
        history,
    });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(state.clone())
            .wrap(cors_middleware())
            .wrap(actix_web::middleware::Logger::default())
            .configure(http::configure_routes)
    })
    .bind((config.server.host.clone(), config.server.port))?
    .run();

    // Graceful shutdown
    let server_handle = server.handle();
    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .expect("Failed to listen for shutdown signal");
        tracing::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    server.await
}
