//! Academy World - client-side game rules
//!
//! Handles player positioning, collision against the baked tile layer,
//! proximity zones and camera placement.
//! Everything here is pure: state goes in, new state comes out.
//!
//! Layout:
//! - `state`: Player and Coin records as mirrored in the shared store
//! - `map`: Boundaries and proximity zones built from the tile layer
//! - `movement`: Step normalization and axis-separated collision resolution
//! - `camera`: Viewport offset centering and clamping
//! - `input`: Held arrow key tracking

pub mod camera;
pub mod error;
pub mod geometry;
pub mod input;
pub mod map;
pub mod movement;
pub mod settings;
pub mod state;

pub use camera::Camera;
pub use error::WorldError;
pub use geometry::Rect;
pub use input::{ArrowKey, InputSampler};
pub use map::{MapLayout, ProximityZone, ZoneFlags, ZoneKind};
pub use movement::{resolve_movement, MoveOutcome, MovementState};
pub use settings::{WorldSettings, ZoneProbe};
pub use state::{coin_key, Coin, Direction, Player};

/// Constants
pub mod constants {
    // Map geometry
    /// Tile edge in pixels
    pub const TILE_SIZE: f64 = 16.0;
    /// Map width in tiles
    pub const MAP_COLS: usize = 140;
    /// Map height in tiles
    pub const MAP_ROWS: usize = 80;

    // Tile ids in the baked collision layer
    /// Impassable tile
    pub const BOUNDARY_TILE: u32 = 15713;
    /// Tile that opens the information popup
    pub const INFORMATION_TILE: u32 = 1001;
    /// Tile that opens the chest popup
    pub const CHEST_TILE: u32 = 1002;

    // Movement
    /// Distance covered per frame, in pixels
    pub const BASE_STEP: f64 = 3.0;
    /// Spawn position
    pub const SPAWN_X: f64 = 320.0;
    pub const SPAWN_Y: f64 = 380.0;

    // Rendering geometry the camera depends on
    /// Player sprite size in pixels
    pub const SPRITE_WIDTH: f64 = 32.0;
    pub const SPRITE_HEIGHT: f64 = 32.0;
    /// Map zoom factor
    pub const ZOOM: f64 = 4.0;
    /// Default viewport (screen) size
    pub const VIEWPORT_WIDTH: f64 = 1920.0;
    pub const VIEWPORT_HEIGHT: f64 = 1065.0;
    /// Camera offset before the first centering
    pub const INITIAL_OFFSET_X: f64 = -1550.0;
    pub const INITIAL_OFFSET_Y: f64 = -1400.0;
    /// Blend factor for smoothed camera follow (per update)
    pub const CAMERA_LERP: f64 = 0.1;
}
