use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub rust_log: String,
}

/// Settings for the external payout RPC that moves funds to player wallets.
#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    pub rpc_url: String,
    pub authority_secret: String,
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let port: u16 = env::var("PORT")?.parse()?;
        let host = env::var("HOST")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let transfer_rpc_url = env::var("TRANSFER_RPC_URL")?;
        let transfer_authority_secret = env::var("TRANSFER_AUTHORITY_SECRET")?;
        let transfer_request_timeout_ms: u64 = env::var("TRANSFER_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()?;

        Ok(Config {
            database: DatabaseConfig { url: database_url },
            server: ServerConfig {
                port,
                host,
                rust_log,
            },
            transfer: TransferConfig {
                rpc_url: transfer_rpc_url,
                authority_secret: transfer_authority_secret,
                request_timeout_ms: transfer_request_timeout_ms,
            },
        })
    }
}
