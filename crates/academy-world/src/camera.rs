//! Camera
//!
//! Viewport offset of the zoomed map. The map is drawn at
//! `offset + world * zoom`, so an offset of (0, 0) shows the top-left corner
//! and the most negative legal offset shows the bottom-right corner.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{INITIAL_OFFSET_X, INITIAL_OFFSET_Y},
    geometry::Rect,
    settings::WorldSettings,
};

/// Camera state
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Screen-space offset of the map's top-left corner
    pub offset_x: f64,
    pub offset_y: f64,
    /// Map zoom factor
    pub zoom: f64,
    /// Viewport size in screen pixels
    pub viewport_width: f64,
    pub viewport_height: f64,
    map_width: f64,
    map_height: f64,
    sprite_width: f64,
    sprite_height: f64,
    lerp: f64,
}

impl Camera {
    /// Camera at the initial offset, clamped to the viewport
    pub fn new(settings: &WorldSettings, viewport_width: f64, viewport_height: f64) -> Self {
        Self::with_offset(
            settings,
            viewport_width,
            viewport_height,
            INITIAL_OFFSET_X,
            INITIAL_OFFSET_Y,
        )
    }

    /// Camera at a given offset, clamped to the viewport
    pub fn with_offset(
        settings: &WorldSettings,
        viewport_width: f64,
        viewport_height: f64,
        offset_x: f64,
        offset_y: f64,
    ) -> Self {
        let mut camera = Self {
            offset_x,
            offset_y,
            zoom: settings.zoom,
            viewport_width,
            viewport_height,
            map_width: settings.map_width(),
            map_height: settings.map_height(),
            sprite_width: settings.sprite_width,
            sprite_height: settings.sprite_height,
            lerp: settings.camera_lerp,
        };
        camera.clamp();
        camera
    }

    /// Lowest legal offset per axis; the highest is always 0.
    ///
    /// When the zoomed map is smaller than the viewport this is positive and
    /// the clamp pins the offset to it.
    pub fn min_offset(&self) -> (f64, f64) {
        (
            self.viewport_width - self.map_width * self.zoom,
            self.viewport_height - self.map_height * self.zoom,
        )
    }

    /// Offset that puts the sprite at (x, y) in the middle of the viewport
    pub fn target_offset(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.viewport_width / 2.0 - (x + self.sprite_width / 2.0) * self.zoom,
            self.viewport_height / 2.0 - (y + self.sprite_height / 2.0) * self.zoom,
        )
    }

    /// Snap the camera onto the sprite at (x, y)
    pub fn center_on(&mut self, x: f64, y: f64) {
        let (target_x, target_y) = self.target_offset(x, y);
        self.offset_x = target_x;
        self.offset_y = target_y;
        self.clamp();
    }

    /// Move a fixed fraction of the way toward centering on (x, y).
    ///
    /// The fraction is per call, not per second, so the glide speed follows
    /// the frame rate.
    pub fn follow(&mut self, x: f64, y: f64) {
        let (target_x, target_y) = self.target_offset(x, y);
        self.offset_x = lerp(self.offset_x, target_x, self.lerp);
        self.offset_y = lerp(self.offset_y, target_y, self.lerp);
        self.clamp();
    }

    /// Viewport changed size (window resize)
    pub fn resize(&mut self, viewport_width: f64, viewport_height: f64) {
        self.viewport_width = viewport_width;
        self.viewport_height = viewport_height;
    }

    /// Keep the map covering the whole viewport
    pub fn clamp(&mut self) {
        let (min_x, min_y) = self.min_offset();
        self.offset_x = self.offset_x.min(0.0).max(min_x);
        self.offset_y = self.offset_y.min(0.0).max(min_y);
    }

    /// Rectangle the player's top-left corner may occupy, in map pixels.
    ///
    /// Derived from the current offset: the left/top limit is the map pixel
    /// at the viewport's left/top edge, and the span is one map minus one
    /// tile.
    pub fn playable_area(&self, tile_size: f64) -> Rect {
        let min_x = -self.offset_x / self.zoom;
        let min_y = -self.offset_y / self.zoom;
        Rect::new(
            min_x,
            min_y,
            self.map_width - tile_size,
            self.map_height - tile_size,
        )
    }
}

fn lerp(start: f64, end: f64, t: f64) -> f64 {
    start + (end - start) * t
}
