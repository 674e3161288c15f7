//! Claim errors

use realtime_store::StoreError;
use thiserror::Error;

/// Errors returned by the reward service
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Wallet missing")]
    WalletMissing,

    #[error("Invalid wallet: {0}")]
    InvalidWallet(String),

    #[error("Claim already in progress")]
    InProgress,

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Invalid faucet secret: {0}")]
    FaucetSecret(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ClaimError {
    /// JSON-RPC error code
    pub fn code(&self) -> i64 {
        match self {
            ClaimError::Unauthenticated(_) => -32001,
            ClaimError::WalletMissing | ClaimError::InvalidWallet(_) | ClaimError::InProgress => {
                -32002
            }
            ClaimError::MethodNotFound(_) => -32601,
            _ => -32603,
        }
    }
}
