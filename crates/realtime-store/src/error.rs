//! Store errors

use thiserror::Error;

/// Errors returned by `SharedStore` implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Unknown or expired token")]
    Unauthenticated,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// JSON-RPC error code when reported over the wire
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidPath(_) => -32602,
            Self::Unauthenticated => -32001,
            Self::Rpc { code, .. } => *code,
            _ => -32603,
        }
    }
}
