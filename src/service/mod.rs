// Service layer: the ledger core and its collaborators.
pub mod history_service;
pub mod ledger_service;
pub mod player_service;
pub mod transfer_service;

pub use history_service::HistoryService;
pub use ledger_service::LedgerService;
pub use player_service::PlayerService;
pub use transfer_service::{
    RetryConfig, TransferApi, TransferClient, TransferError, TransferOutcome,
};
