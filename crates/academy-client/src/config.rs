//! Session Configuration

use academy_world::{
    constants::{VIEWPORT_HEIGHT, VIEWPORT_WIDTH},
    WorldSettings,
};
use serde::{Deserialize, Serialize};

/// Debounce window for position writes, in milliseconds
pub const DEBOUNCE_MS: u64 = 100;
/// Frame period, in milliseconds (~60Hz)
pub const FRAME_MS: u64 = 16;
/// Delays between coin placements, picked at random
pub const COIN_INTERVALS_MS: [u64; 4] = [2000, 3000, 4000, 5000];
/// Time the chest popup must be open before a claim is accepted
pub const CHEST_UNLOCK_MS: u64 = 1000;

/// State publisher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Quiet period before the newest position is written
    pub debounce_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
        }
    }
}

/// Game session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frame period in milliseconds
    pub frame_ms: u64,
    /// Viewport size in screen pixels
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Glide the camera toward the player each frame instead of snapping
    pub smooth_camera: bool,
    /// Run the coin placer
    pub spawn_coins: bool,
    /// Delays between coin placements
    pub coin_intervals_ms: Vec<u64>,
    /// Chest claim unlock delay
    pub chest_unlock_ms: u64,
    /// Publisher settings
    pub publisher: PublisherConfig,
    /// Geometry and movement tuning
    pub world: WorldSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_ms: FRAME_MS,
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            smooth_camera: false,
            spawn_coins: true,
            coin_intervals_ms: COIN_INTERVALS_MS.to_vec(),
            chest_unlock_ms: CHEST_UNLOCK_MS,
            publisher: PublisherConfig::default(),
            world: WorldSettings::default(),
        }
    }
}
