//! Challenge records
//!
//! Completed lesson challenges, stored under `challenges/challenge_{id}`.

use chrono::{DateTime, Utc};
use realtime_store::SharedStore;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Challenge record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    pub id: u64,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

pub fn challenge_path(id: u64) -> String {
    format!("challenges/challenge_{}", id)
}

/// Write a challenge record stamped with the current time
pub async fn add_challenge(
    store: &dyn SharedStore,
    id: u64,
    uri: &str,
) -> Result<ChallengeRecord, SessionError> {
    let record = ChallengeRecord {
        id,
        uri: uri.to_string(),
        created_at: Utc::now(),
    };
    store
        .set(&challenge_path(id), serde_json::to_value(&record)?)
        .await?;
    tracing::info!("Recorded challenge {}", id);
    Ok(record)
}

/// All challenge records, ordered by id. Malformed entries are skipped.
pub async fn list_challenges(store: &dyn SharedStore) -> Result<Vec<ChallengeRecord>, SessionError> {
    let value = store.get("challenges").await?;
    let mut records: Vec<ChallengeRecord> = value
        .as_object()
        .map(|entries| {
            entries
                .values()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    records.sort_by_key(|record| record.id);
    Ok(records)
}
