//! Wallet linking
//!
//! The wallet lives in `profiles/{uid}`, next to the reward claim status,
//! so it survives the player record being removed on disconnect.

use chrono::Utc;
use realtime_store::SharedStore;
use serde_json::{json, Map};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::SessionError;

/// Store path of a profile
pub fn profile_path(uid: &str) -> String {
    format!("profiles/{}", uid)
}

/// Merge `{wallet, updatedAt}` into the user's profile after checking the
/// address parses as a Solana public key
pub async fn link_wallet(
    store: &dyn SharedStore,
    uid: &str,
    wallet: &str,
) -> Result<Pubkey, SessionError> {
    let wallet = wallet.trim();
    let pubkey =
        Pubkey::from_str(wallet).map_err(|_| SessionError::InvalidWallet(wallet.to_string()))?;

    let mut fields = Map::new();
    fields.insert("wallet".into(), json!(pubkey.to_string()));
    fields.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
    store.update(&profile_path(uid), fields).await?;

    tracing::info!("Linked wallet {} to {}", pubkey, uid);
    Ok(pubkey)
}

/// True if the user has linked a wallet
pub async fn has_wallet(store: &dyn SharedStore, uid: &str) -> Result<bool, SessionError> {
    let wallet = store
        .get(&format!("{}/wallet", profile_path(uid)))
        .await?;
    Ok(wallet.as_str().is_some_and(|w| !w.is_empty()))
}
