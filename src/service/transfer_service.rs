//! Payout transfer client.
//!
//! Submits wallet payouts to an external transfer RPC and polls until the
//! transfer reaches a terminal state. The ledger treats this client as the
//! system of record for "did money leave": a transfer is only ever reported
//! `Confirmed` on explicit confirmation, and anything indeterminate
//! (timeout, polling exhausted, transport failure after submission) is
//! reported `Ambiguous` rather than guessed.

use crate::config::TransferConfig;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Terminal classification of one transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The network confirmed the transfer; funds left the treasury.
    Confirmed { tx_hash: String },
    /// The network explicitly rejected the transfer; no funds moved.
    Failed { reason: String },
    /// The outcome could not be determined. Funds may or may not have
    /// moved; the caller must not retry until reconciled.
    Ambiguous { reason: String },
}

/// Errors raised before anything was submitted to the network. Safe to
/// retry; no funds can have moved.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Seam between the ledger and the external collaborator, so withdrawal
/// settlement can be exercised with scripted outcomes.
pub trait TransferApi: Send + Sync + 'static {
    fn transfer(
        &self,
        wallet_address: &str,
        amount: i64,
        reference: &str,
    ) -> impl Future<Output = Result<TransferOutcome, TransferError>> + Send;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_polls: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_polls: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Confirmed,
    Failed,
    Pending,
}

/// Map a status string from the transfer RPC onto a polling decision.
/// Unrecognized statuses are treated as still pending; only an explicit
/// "failed" means no funds moved.
fn classify_status(status: &str) -> StatusClass {
    match status {
        "confirmed" | "finalized" => StatusClass::Confirmed,
        "failed" => StatusClass::Failed,
        _ => StatusClass::Pending,
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    #[serde(flatten)]
    result: RpcResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResult {
    Success { result: serde_json::Value },
    Error { error: RpcError },
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubmitTransferResponse {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct TransferStatusResponse {
    status: String,
}

/// Reqwest-backed client for the payout RPC.
#[derive(Clone)]
pub struct TransferClient {
    config: TransferConfig,
    client: reqwest::Client,
    retry_config: RetryConfig,
}

impl TransferClient {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(config: TransferConfig, retry_config: RetryConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            retry_config,
        }
    }

    /// Submit the transfer, then poll its status until terminal or until
    /// polling is exhausted.
    async fn run_transfer(
        &self,
        wallet_address: &str,
        amount: i64,
        reference: &str,
    ) -> Result<TransferOutcome, TransferError> {
        info!(
            wallet = wallet_address,
            amount = amount,
            reference = reference,
            "Submitting transfer"
        );

        let params = serde_json::json!({
            "destination": wallet_address,
            "lamports": amount,
            "reference": reference,
            "authority": self.config.authority_secret,
        });

        let submitted: SubmitTransferResponse =
            match self.rpc_call("submitTransfer", params).await {
                Ok(resp) => resp,
                Err(TransferError::NetworkError(e)) if e.is_connect() => {
                    // Connection never established; nothing reached the RPC.
                    return Err(TransferError::NetworkError(e));
                }
                Err(e) => {
                    // The request may have reached the RPC before the error.
                    warn!(error = %e, "Transfer submission outcome unknown");
                    return Ok(TransferOutcome::Ambiguous {
                        reason: format!("submission outcome unknown: {}", e),
                    });
                }
            };

        info!(signature = submitted.signature, "Transfer submitted");

        self.poll_until_terminal(&submitted.signature).await
    }

    async fn poll_until_terminal(
        &self,
        signature: &str,
    ) -> Result<TransferOutcome, TransferError> {
        let mut delay = self.retry_config.initial_delay_ms;

        for attempt in 0..self.retry_config.max_polls {
            debug!(
                signature = signature,
                attempt = attempt,
                delay_ms = delay,
                "Waiting before status poll"
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay = (delay as f64 * self.retry_config.backoff_multiplier) as u64;
            delay = delay.min(self.retry_config.max_delay_ms);

            let params = serde_json::json!({ "signature": signature });
            match self
                .rpc_call::<TransferStatusResponse>("getTransferStatus", params)
                .await
            {
                Ok(resp) => match classify_status(&resp.status) {
                    StatusClass::Confirmed => {
                        info!(signature = signature, "Transfer confirmed");
                        return Ok(TransferOutcome::Confirmed {
                            tx_hash: signature.to_string(),
                        });
                    }
                    StatusClass::Failed => {
                        warn!(signature = signature, "Transfer failed on network");
                        return Ok(TransferOutcome::Failed {
                            reason: "transfer failed on network".to_string(),
                        });
                    }
                    StatusClass::Pending => {}
                },
                Err(e) => {
                    // The transfer was already submitted; a polling failure
                    // says nothing about whether it landed.
                    warn!(
                        signature = signature,
                        attempt = attempt,
                        error = %e,
                        "Error polling transfer status"
                    );
                }
            }
        }

        Ok(TransferOutcome::Ambiguous {
            reason: format!(
                "transfer {} still unresolved after {} polls",
                signature, self.retry_config.max_polls
            ),
        })
    }

    async fn rpc_call<T>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, TransferError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: method.to_string(),
            params,
        };

        let response = self
            .client
            .post(&self.config.rpc_url)
            .timeout(Duration::from_millis(self.config.request_timeout_ms))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransferError::RpcError(format!("HTTP {}: {}", status, text)));
        }

        let rpc_response: RpcResponse = serde_json::from_str(&text)?;

        match rpc_response.result {
            RpcResult::Success { result } => {
                serde_json::from_value(result).map_err(TransferError::SerializationError)
            }
            RpcResult::Error { error } => Err(TransferError::RpcError(format!(
                "RPC error {}: {}",
                error.code, error.message
            ))),
        }
    }
}

impl TransferApi for TransferClient {
    fn transfer(
        &self,
        wallet_address: &str,
        amount: i64,
        reference: &str,
    ) -> impl Future<Output = Result<TransferOutcome, TransferError>> + Send {
        self.run_transfer(wallet_address, amount, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TransferConfig {
        TransferConfig {
            rpc_url: "http://localhost:8899".to_string(),
            authority_secret: "test-authority".to_string(),
            request_timeout_ms: 1000,
        }
    }

    #[test]
    fn test_classify_status_terminal_states() {
        assert_eq!(classify_status("confirmed"), StatusClass::Confirmed);
        assert_eq!(classify_status("finalized"), StatusClass::Confirmed);
        assert_eq!(classify_status("failed"), StatusClass::Failed);
    }

    #[test]
    fn test_classify_status_treats_unrecognized_as_pending() {
        // Never assume failure from a status we do not understand.
        assert_eq!(classify_status("pending"), StatusClass::Pending);
        assert_eq!(classify_status("processing"), StatusClass::Pending);
        assert_eq!(classify_status(""), StatusClass::Pending);
        assert_eq!(classify_status("SUCCESS"), StatusClass::Pending);
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_polls, 5);
        assert_eq!(config.initial_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 10000);
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_rpc_response_success_envelope() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"signature":"5KtP9"}}"#;
        let resp: RpcResponse = serde_json::from_str(json).unwrap();
        match resp.result {
            RpcResult::Success { result } => {
                let submitted: SubmitTransferResponse =
                    serde_json::from_value(result).unwrap();
                assert_eq!(submitted.signature, "5KtP9");
            }
            RpcResult::Error { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_rpc_response_error_envelope() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"insufficient funds"}}"#;
        let resp: RpcResponse = serde_json::from_str(json).unwrap();
        match resp.result {
            RpcResult::Error { error } => {
                assert_eq!(error.code, -32000);
                assert_eq!(error.message, "insufficient funds");
            }
            RpcResult::Success { .. } => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn test_poll_exhaustion_reports_ambiguous() {
        // Nothing listens on this port, so every poll errors out; once the
        // poll budget is spent the outcome must be Ambiguous, never Failed.
        let config = TransferConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            authority_secret: "test-authority".to_string(),
            request_timeout_ms: 200,
        };
        let client = TransferClient::with_retry_config(
            config,
            RetryConfig {
                max_polls: 2,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                backoff_multiplier: 1.0,
            },
        );

        let outcome = client.poll_until_terminal("5KtP9sig").await.unwrap();
        match outcome {
            TransferOutcome::Ambiguous { reason } => {
                assert!(reason.contains("5KtP9sig"));
                assert!(reason.contains("2 polls"));
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_client_creation() {
        let _client = TransferClient::new(test_config());
        let _client = TransferClient::with_retry_config(
            test_config(),
            RetryConfig {
                max_polls: 2,
                initial_delay_ms: 10,
                max_delay_ms: 50,
                backoff_multiplier: 1.5,
            },
        );
    }
}
