//! Session errors

use realtime_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the game session and its helpers
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),

    #[error("Reward claim failed: {0}")]
    Reward(String),

    #[error("Event queue full")]
    QueueFull,

    #[error("Session stopped")]
    Stopped,
}
