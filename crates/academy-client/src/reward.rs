//! Reward claim client
//!
//! `RewardClient` calls the reward service's `claimTreasure` method with the
//! session's bearer token. `ChestClaim` gates the call: the chest popup must
//! stay open for the unlock delay before a claim goes out, and every outcome
//! becomes a user-visible message.

use jsonrpsee::{
    core::{client::ClientT, ClientError},
    http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder},
    rpc_params,
};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::SessionError;

/// Reward service method name
pub const CLAIM_METHOD: &str = "claimTreasure";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP JSON-RPC client for the reward service
pub struct RewardClient {
    client: HttpClient,
}

impl RewardClient {
    /// Client that authenticates every call with `token`
    pub fn new(url: &str, token: &str) -> Result<Self, SessionError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| SessionError::Reward(e.to_string()))?;
        headers.insert("Authorization", bearer);

        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(REQUEST_TIMEOUT)
            .build(url)
            .map_err(|e| SessionError::Reward(e.to_string()))?;

        Ok(Self { client })
    }

    /// Claim the treasure; returns the transfer signature, or
    /// `already-claimed`
    pub async fn claim_treasure(&self) -> Result<String, SessionError> {
        self.client
            .request(CLAIM_METHOD, rpc_params![])
            .await
            .map_err(|e| match e {
                ClientError::Call(call) => SessionError::Reward(call.message().to_string()),
                other => SessionError::Reward(other.to_string()),
            })
    }
}

/// Unlock timer for the chest popup
#[derive(Clone, Debug)]
pub struct ChestClaim {
    unlock_after: Duration,
    opened_at: Option<Instant>,
}

impl ChestClaim {
    pub fn new(unlock_after: Duration) -> Self {
        Self {
            unlock_after,
            opened_at: None,
        }
    }

    /// Feed the chest zone flag. The timer starts when the popup opens and
    /// resets when it closes.
    pub fn observe(&mut self, chest_open: bool, now: Instant) {
        match (chest_open, self.opened_at) {
            (true, None) => self.opened_at = Some(now),
            (false, Some(_)) => self.opened_at = None,
            _ => {}
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// Whole seconds until a claim is accepted (0 once unlocked)
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let Some(opened_at) = self.opened_at else {
            return self.unlock_after.as_millis().div_ceil(1000) as u64;
        };
        let remaining = self
            .unlock_after
            .saturating_sub(now.saturating_duration_since(opened_at));
        remaining.as_millis().div_ceil(1000) as u64
    }

    pub fn can_claim(&self, now: Instant) -> bool {
        self.is_open() && self.remaining_secs(now) == 0
    }

    /// Attempt the claim. Returns None while still locked, otherwise the
    /// message to show.
    pub async fn claim(&self, client: &RewardClient, now: Instant) -> Option<String> {
        if !self.can_claim(now) {
            return None;
        }
        Some(claim_message(client.claim_treasure().await))
    }
}

/// User-visible text for a claim outcome
pub fn claim_message(result: Result<String, SessionError>) -> String {
    match result {
        Ok(signature) => format!("Reward sent!\nTx: {}", signature),
        Err(SessionError::Reward(message)) => format!("Error: {}", message),
        Err(e) => format!("Error: {}", e),
    }
}
