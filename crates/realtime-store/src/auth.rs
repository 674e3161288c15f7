//! Anonymous sign-in
//!
//! Issues a random uid with a bearer token. The reward service resolves
//! tokens back to uids.

use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;

const UID_LEN: usize = 28;
const TOKEN_LEN: usize = 48;

/// Signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub token: String,
}

/// Token registry shared by the store server and the reward service
#[derive(Clone, Default)]
pub struct AuthRegistry {
    /// token -> uid
    tokens: Arc<DashMap<String, String>>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh anonymous user
    pub fn sign_in_anonymously(&self) -> Identity {
        let identity = Identity {
            uid: random_string(UID_LEN),
            token: random_string(TOKEN_LEN),
        };
        self.tokens
            .insert(identity.token.clone(), identity.uid.clone());
        tracing::info!("Anonymous sign-in: {}", identity.uid);
        identity
    }

    /// Resolve a token to its uid
    pub fn verify(&self, token: &str) -> Result<String, StoreError> {
        self.tokens
            .get(token)
            .map(|uid| uid.value().clone())
            .ok_or(StoreError::Unauthenticated)
    }

    /// Invalidate a token
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
