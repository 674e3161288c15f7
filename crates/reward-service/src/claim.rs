//! Treasure claims
//!
//! A signed-in user with a linked wallet can claim the treasure once. The
//! claim status lives next to the wallet in `profiles/{uid}`.

use dashmap::DashMap;
use realtime_store::{AuthRegistry, MemoryStore};
use serde_json::{json, Map};
use solana_sdk::pubkey::Pubkey;
use std::{str::FromStr, sync::Arc};

use crate::{error::ClaimError, transfer::TransferSubmitter};

/// JSON-RPC method name
pub const CLAIM_METHOD: &str = "claimTreasure";

/// Result returned when the user was already paid
pub const ALREADY_CLAIMED: &str = "already-claimed";

fn profile_path(uid: &str) -> String {
    format!("profiles/{}", uid)
}

/// Claim handler shared by every request
pub struct ClaimService {
    store: MemoryStore,
    auth: AuthRegistry,
    submitter: Arc<dyn TransferSubmitter>,
    reward_lamports: u64,
    /// Users with a claim being processed
    in_flight: DashMap<String, ()>,
}

/// Clears the in-flight mark when the claim finishes
struct InFlight<'a> {
    claims: &'a DashMap<String, ()>,
    uid: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.claims.remove(&self.uid);
    }
}

impl ClaimService {
    pub fn new(
        store: MemoryStore,
        auth: AuthRegistry,
        submitter: Arc<dyn TransferSubmitter>,
        reward_lamports: u64,
    ) -> Self {
        Self {
            store,
            auth,
            submitter,
            reward_lamports,
            in_flight: DashMap::new(),
        }
    }

    /// Account rewards are paid from
    pub fn faucet(&self) -> Pubkey {
        self.submitter.faucet()
    }

    /// Pay the treasure reward to the caller's wallet.
    ///
    /// Returns the transfer signature, or `already-claimed` if the profile
    /// was already paid.
    pub async fn claim_treasure(&self, token: Option<&str>) -> Result<String, ClaimError> {
        let token = token.ok_or_else(|| {
            ClaimError::Unauthenticated("Missing or malformed Authorization header".to_string())
        })?;
        let uid = self
            .auth
            .verify(token)
            .map_err(|_| ClaimError::Unauthenticated("Invalid token".to_string()))?;

        let _guard = self.begin(&uid)?;
        let path = profile_path(&uid);
        let profile = self.store.get(&path);

        let wallet = profile["wallet"]
            .as_str()
            .filter(|wallet| !wallet.is_empty())
            .ok_or(ClaimError::WalletMissing)?;

        if profile["treasureClaimed"].as_bool() == Some(true) {
            tracing::info!("Treasure already claimed by {}", uid);
            return Ok(ALREADY_CLAIMED.to_string());
        }

        let to = Pubkey::from_str(wallet)
            .map_err(|_| ClaimError::InvalidWallet(wallet.to_string()))?;
        let signature = self.submitter.transfer(&to, self.reward_lamports).await?;

        let mut fields = Map::new();
        fields.insert("treasureClaimed".into(), json!(true));
        fields.insert("txSig".into(), json!(signature.to_string()));
        self.store.update(&path, fields)?;

        tracing::info!(
            "Paid {} lamports to {} for {} ({})",
            self.reward_lamports,
            to,
            uid,
            signature
        );
        Ok(signature.to_string())
    }

    fn begin(&self, uid: &str) -> Result<InFlight<'_>, ClaimError> {
        if self.in_flight.insert(uid.to_string(), ()).is_some() {
            return Err(ClaimError::InProgress);
        }
        Ok(InFlight {
            claims: &self.in_flight,
            uid: uid.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::mock::MockSubmitter;
    use serde_json::Value;

    const WALLET: &str = "So11111111111111111111111111111111111111112";

    fn service(submitter: Arc<MockSubmitter>) -> (ClaimService, MemoryStore, AuthRegistry) {
        let store = MemoryStore::new();
        let auth = AuthRegistry::new();
        let service = ClaimService::new(store.clone(), auth.clone(), submitter, 100);
        (service, store, auth)
    }

    #[tokio::test]
    async fn test_rejects_missing_or_unknown_token() {
        let submitter = Arc::new(MockSubmitter::default());
        let (service, _, _) = service(submitter.clone());
        assert_eq!(service.faucet(), Pubkey::default());

        let err = service.claim_treasure(None).await.unwrap_err();
        assert_eq!(err.code(), -32001);

        let err = service.claim_treasure(Some("bogus")).await.unwrap_err();
        assert!(matches!(err, ClaimError::Unauthenticated(_)));
        assert_eq!(submitter.count(), 0);
    }

    #[tokio::test]
    async fn test_wallet_missing() {
        let submitter = Arc::new(MockSubmitter::default());
        let (service, _, auth) = service(submitter.clone());
        let identity = auth.sign_in_anonymously();

        let err = service
            .claim_treasure(Some(&identity.token))
            .await
            .unwrap_err();

        assert!(matches!(err, ClaimError::WalletMissing));
        assert_eq!(err.to_string(), "Wallet missing");
        assert_eq!(submitter.count(), 0);
    }

    #[tokio::test]
    async fn test_claim_pays_once() {
        let submitter = Arc::new(MockSubmitter::default());
        let (service, store, auth) = service(submitter.clone());
        let identity = auth.sign_in_anonymously();
        store
            .set(
                &profile_path(&identity.uid),
                json!({ "wallet": WALLET, "updatedAt": "2026-01-01T00:00:00Z" }),
            )
            .unwrap();

        let signature = service
            .claim_treasure(Some(&identity.token))
            .await
            .unwrap();

        {
            let transfers = submitter.transfers.lock();
            assert_eq!(transfers.len(), 1);
            assert_eq!(transfers[0].0.to_string(), WALLET);
            assert_eq!(transfers[0].1, 100);
            assert_eq!(transfers[0].2.to_string(), signature);
        }

        let profile = store.get(&profile_path(&identity.uid));
        assert_eq!(profile["treasureClaimed"], json!(true));
        assert_eq!(profile["txSig"], json!(signature));
        assert_eq!(profile["wallet"], json!(WALLET));

        let again = service
            .claim_treasure(Some(&identity.token))
            .await
            .unwrap();
        assert_eq!(again, ALREADY_CLAIMED);
        assert_eq!(submitter.count(), 1);
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_profile_unclaimed() {
        let submitter = Arc::new(MockSubmitter::failing());
        let (service, store, auth) = service(submitter);
        let identity = auth.sign_in_anonymously();
        store
            .set(&profile_path(&identity.uid), json!({ "wallet": WALLET }))
            .unwrap();

        let err = service
            .claim_treasure(Some(&identity.token))
            .await
            .unwrap_err();

        assert!(matches!(err, ClaimError::Transfer(_)));
        assert_eq!(
            store.get(&format!("{}/treasureClaimed", profile_path(&identity.uid))),
            Value::Null
        );
        // The in-flight mark is released, so a retry reaches the submitter
        assert!(matches!(
            service.claim_treasure(Some(&identity.token)).await,
            Err(ClaimError::Transfer(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_wallet() {
        let submitter = Arc::new(MockSubmitter::default());
        let (service, store, auth) = service(submitter.clone());
        let identity = auth.sign_in_anonymously();
        store
            .set(&profile_path(&identity.uid), json!({ "wallet": "nope" }))
            .unwrap();

        let err = service
            .claim_treasure(Some(&identity.token))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidWallet(_)));
        assert_eq!(submitter.count(), 0);
    }
}
