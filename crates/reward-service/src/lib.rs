//! Reward Service - treasure claims paid out on Solana devnet
//!
//! Provides the `claimTreasure` endpoint:
//! - HTTP JSON-RPC with bearer-token auth against the store's sign-in registry
//! - Faucet keypair loaded from `FAUCET_SECRET`
//! - Lamport transfers submitted and confirmed over Solana JSON-RPC

pub mod claim;
pub mod error;
pub mod faucet;
pub mod http_server;
pub mod transfer;

pub use claim::{ClaimService, ALREADY_CLAIMED, CLAIM_METHOD};
pub use error::ClaimError;
pub use faucet::{faucet_from_env, parse_faucet_secret, FAUCET_SECRET_ENV};
pub use http_server::RewardServer;
pub use transfer::{DevnetSubmitter, TransferSubmitter};

use serde::{Deserialize, Serialize};

/// Reward service configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,
    /// Lamports paid per claim
    pub reward_lamports: u64,
    /// Give up waiting for confirmation after this long
    pub confirm_timeout_ms: u64,
    /// Delay between signature status polls
    pub poll_interval_ms: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            reward_lamports: 100,
            confirm_timeout_ms: 60_000,
            poll_interval_ms: 500,
        }
    }
}
