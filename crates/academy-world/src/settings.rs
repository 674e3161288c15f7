//! World settings

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Which Y coordinate the proximity zone check uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneProbe {
    /// Resolved X with the Y attempted before collision
    #[default]
    AttemptedY,
    /// Resolved X and resolved Y
    Resolved,
}

/// Geometry and movement tuning shared by the resolver and the camera
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Tile edge in pixels (also the player's collision box)
    pub tile_size: f64,
    /// Map width in tiles
    pub cols: usize,
    /// Map height in tiles
    pub rows: usize,
    /// Step length per resolution, in pixels
    pub base_step: f64,
    /// Sprite size used to center the camera
    pub sprite_width: f64,
    pub sprite_height: f64,
    /// Map zoom factor
    pub zoom: f64,
    /// Blend factor for `Camera::follow`
    pub camera_lerp: f64,
    /// Proximity zone probe position
    pub zone_probe: ZoneProbe,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            cols: MAP_COLS,
            rows: MAP_ROWS,
            base_step: BASE_STEP,
            sprite_width: SPRITE_WIDTH,
            sprite_height: SPRITE_HEIGHT,
            zoom: ZOOM,
            camera_lerp: CAMERA_LERP,
            zone_probe: ZoneProbe::default(),
        }
    }
}

impl WorldSettings {
    /// Map image width in pixels
    pub fn map_width(&self) -> f64 {
        self.cols as f64 * self.tile_size
    }

    /// Map image height in pixels
    pub fn map_height(&self) -> f64 {
        self.rows as f64 * self.tile_size
    }

    /// Number of tiles the collision layer must contain
    pub fn tile_count(&self) -> usize {
        self.cols * self.rows
    }
}
