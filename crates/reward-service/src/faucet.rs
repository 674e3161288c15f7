//! Faucet keypair loading

use solana_sdk::signature::Keypair;

use crate::error::ClaimError;

/// Environment variable holding the faucet secret
pub const FAUCET_SECRET_ENV: &str = "FAUCET_SECRET";

const SECRET_LEN: usize = 64;

/// Parse a faucet secret given either as a JSON byte array or as base58
pub fn parse_faucet_secret(raw: &str) -> Result<Keypair, ClaimError> {
    let raw = raw.trim();
    let bytes: Vec<u8> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|e| ClaimError::FaucetSecret(e.to_string()))?
    } else {
        bs58::decode(raw)
            .into_vec()
            .map_err(|e| ClaimError::FaucetSecret(e.to_string()))?
    };

    if bytes.len() != SECRET_LEN {
        return Err(ClaimError::FaucetSecret(format!(
            "secret is {} bytes, expected {}",
            bytes.len(),
            SECRET_LEN
        )));
    }

    Keypair::from_bytes(&bytes).map_err(|e| ClaimError::FaucetSecret(e.to_string()))
}

/// Load the faucet keypair from `FAUCET_SECRET`
pub fn faucet_from_env() -> Result<Keypair, ClaimError> {
    let raw = std::env::var(FAUCET_SECRET_ENV)
        .map_err(|_| ClaimError::FaucetSecret(format!("{} missing", FAUCET_SECRET_ENV)))?;
    parse_faucet_secret(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;

    #[test]
    fn test_parse_json_array() {
        let keypair = Keypair::new();
        let raw = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();

        let parsed = parse_faucet_secret(&format!("  {}\n", raw)).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_parse_base58() {
        let keypair = Keypair::new();

        let parsed = parse_faucet_secret(&keypair.to_base58_string()).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = parse_faucet_secret("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("3 bytes"));

        let short = bs58::encode([7u8; 32]).into_string();
        assert!(matches!(
            parse_faucet_secret(&short),
            Err(ClaimError::FaucetSecret(_))
        ));
        assert!(parse_faucet_secret("not base58 0OIl").is_err());
    }
}
