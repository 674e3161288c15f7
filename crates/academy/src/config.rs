//! Academy Configuration

use academy_client::SessionConfig;
use anyhow::Context;
use reward_service::RewardConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, read from the `--config` JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademyConfig {
    /// Game session settings (`play`)
    pub session: SessionConfig,
    /// Reward service settings (`serve`)
    pub reward: RewardConfig,
}

impl AcademyConfig {
    /// Load from a JSON file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {:?}", path))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid config {:?}", path))
    }
}
