//! Transfer Submitter - pays rewards on Solana
//!
//! Builds a system transfer from the faucet, signs it, and submits it over
//! Solana JSON-RPC, then polls signature status until the cluster reports it
//! confirmed.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use jsonrpsee::{
    core::client::ClientT,
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
    transaction::Transaction,
};
use std::{str::FromStr, time::Duration};
use tokio::time::Instant;

use crate::{error::ClaimError, RewardConfig};

/// Submits reward transfers and waits for them to land
#[async_trait]
pub trait TransferSubmitter: Send + Sync {
    /// Account the rewards are paid from
    fn faucet(&self) -> Pubkey;

    /// Transfer `lamports` to `to`; returns once the transfer is confirmed
    async fn transfer(&self, to: &Pubkey, lamports: u64) -> Result<Signature, ClaimError>;
}

// ============ RPC Response Types ============

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashInfo {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

impl SignatureStatus {
    fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

/// Transfer submitter backed by a Solana JSON-RPC node
pub struct DevnetSubmitter {
    client: HttpClient,
    faucet: Keypair,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl DevnetSubmitter {
    pub fn new(faucet: Keypair, config: &RewardConfig) -> Result<Self, ClaimError> {
        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(&config.rpc_url)
            .map_err(|e| ClaimError::Transfer(e.to_string()))?;

        tracing::info!("Submitting reward transfers to {}", config.rpc_url);

        Ok(Self {
            client,
            faucet,
            confirm_timeout: Duration::from_millis(config.confirm_timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash, ClaimError> {
        let response: RpcResponse<BlockhashInfo> = self
            .client
            .request(
                "getLatestBlockhash",
                rpc_params![json!({ "commitment": "confirmed" })],
            )
            .await
            .map_err(rpc_error)?;

        Hash::from_str(&response.value.blockhash)
            .map_err(|e| ClaimError::Transfer(format!("Invalid blockhash: {}", e)))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ClaimError> {
        let bytes = bincode::serialize(tx).map_err(|e| ClaimError::Transfer(e.to_string()))?;
        let encoded = BASE64.encode(bytes);

        let signature: String = self
            .client
            .request(
                "sendTransaction",
                rpc_params![
                    encoded,
                    json!({ "encoding": "base64", "preflightCommitment": "confirmed" })
                ],
            )
            .await
            .map_err(rpc_error)?;

        Signature::from_str(&signature)
            .map_err(|e| ClaimError::Transfer(format!("Invalid signature: {}", e)))
    }

    async fn wait_for_confirmation(&self, signature: &Signature) -> Result<(), ClaimError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            let response: RpcResponse<Vec<Option<SignatureStatus>>> = self
                .client
                .request(
                    "getSignatureStatuses",
                    rpc_params![vec![signature.to_string()]],
                )
                .await
                .map_err(rpc_error)?;

            if let Some(Some(status)) = response.value.first() {
                if let Some(err) = &status.err {
                    return Err(ClaimError::Transfer(format!(
                        "Transaction {} failed: {}",
                        signature, err
                    )));
                }
                if status.is_confirmed() {
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(ClaimError::Transfer(format!(
                    "Transaction {} not confirmed within {:?}",
                    signature, self.confirm_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl TransferSubmitter for DevnetSubmitter {
    fn faucet(&self) -> Pubkey {
        self.faucet.pubkey()
    }

    async fn transfer(&self, to: &Pubkey, lamports: u64) -> Result<Signature, ClaimError> {
        let from = self.faucet.pubkey();
        let instruction = system_instruction::transfer(&from, to, lamports);
        let blockhash = self.latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&from),
            &[&self.faucet],
            blockhash,
        );

        let signature = self.send_transaction(&tx).await?;
        tracing::debug!("Submitted transfer {} ({} lamports to {})", signature, lamports, to);

        self.wait_for_confirmation(&signature).await?;
        Ok(signature)
    }
}

fn rpc_error(error: jsonrpsee::core::ClientError) -> ClaimError {
    ClaimError::Transfer(error.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_status_confirmation() {
        let status: SignatureStatus = serde_json::from_value(json!({
            "slot": 10,
            "confirmations": 0,
            "err": null,
            "confirmationStatus": "processed"
        }))
        .unwrap();
        assert!(!status.is_confirmed());
        assert!(status.err.is_none());

        let status: SignatureStatus =
            serde_json::from_value(json!({ "err": null, "confirmationStatus": "finalized" }))
                .unwrap();
        assert!(status.is_confirmed());
    }

    #[test]
    fn test_transfer_transaction_shape() {
        let faucet = Keypair::new();
        let to = Pubkey::new_unique();
        let instruction = system_instruction::transfer(&faucet.pubkey(), &to, 100);
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&faucet.pubkey()),
            &[&faucet],
            Hash::new_unique(),
        );

        assert!(tx.is_signed());
        assert_eq!(tx.message.account_keys[0], faucet.pubkey());
        assert!(tx.message.account_keys.contains(&to));

        let bytes = bincode::serialize(&tx).unwrap();
        let decoded: Transaction =
            bincode::deserialize(&BASE64.decode(BASE64.encode(&bytes)).unwrap()).unwrap();
        assert_eq!(decoded.signatures[0], tx.signatures[0]);
    }
}
