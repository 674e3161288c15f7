//! Map Layout
//!
//! Boundaries and proximity zones baked from the collision tile layer.
//! The layout is built once at session start and never mutated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{BOUNDARY_TILE, CHEST_TILE, INFORMATION_TILE},
    error::WorldError,
    geometry::Rect,
    settings::WorldSettings,
};

/// Named popup zones
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneKind {
    Information,
    Chest,
}

impl ZoneKind {
    /// Zone kind encoded by a tile id, if any
    pub fn from_tile(tile: u32) -> Option<Self> {
        match tile {
            INFORMATION_TILE => Some(Self::Information),
            CHEST_TILE => Some(Self::Chest),
            _ => None,
        }
    }
}

/// Rectangle that raises a popup flag while the player overlaps it
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximityZone {
    pub kind: ZoneKind,
    pub area: Rect,
}

/// Popup flags derived from the player's position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneFlags {
    pub information: bool,
    pub chest: bool,
}

impl ZoneFlags {
    pub fn get(&self, kind: ZoneKind) -> bool {
        match kind {
            ZoneKind::Information => self.information,
            ZoneKind::Chest => self.chest,
        }
    }

    fn set(&mut self, kind: ZoneKind) {
        match kind {
            ZoneKind::Information => self.information = true,
            ZoneKind::Chest => self.chest = true,
        }
    }
}

/// Static obstacles and zones for one map
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapLayout {
    boundaries: Vec<Rect>,
    zones: Vec<ProximityZone>,
}

impl MapLayout {
    pub fn new(boundaries: Vec<Rect>, zones: Vec<ProximityZone>) -> Self {
        Self { boundaries, zones }
    }

    /// Build the layout from a row-major tile id array of `cols * rows`
    pub fn from_tiles(tiles: &[u32], settings: &WorldSettings) -> Result<Self, WorldError> {
        let expected = settings.tile_count();
        if tiles.len() != expected {
            return Err(WorldError::LayerSize {
                expected,
                actual: tiles.len(),
            });
        }

        let tile = settings.tile_size;
        let mut layout = Self::default();

        for (index, &cell) in tiles.iter().enumerate() {
            let col = (index % settings.cols) as f64;
            let row = (index / settings.cols) as f64;
            let area = Rect::square(col * tile, row * tile, tile);

            if cell == BOUNDARY_TILE {
                layout.boundaries.push(area);
            } else if let Some(kind) = ZoneKind::from_tile(cell) {
                layout.zones.push(ProximityZone { kind, area });
            }
        }

        Ok(layout)
    }

    /// Parse a JSON array of tile ids
    pub fn from_json(json: &str, settings: &WorldSettings) -> Result<Self, WorldError> {
        let tiles: Vec<u32> = serde_json::from_str(json)?;
        Self::from_tiles(&tiles, settings)
    }

    /// Load a JSON tile layer from disk
    pub fn load<P: AsRef<Path>>(path: P, settings: &WorldSettings) -> Result<Self, WorldError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, settings)
    }

    pub fn boundaries(&self) -> &[Rect] {
        &self.boundaries
    }

    pub fn zones(&self) -> &[ProximityZone] {
        &self.zones
    }

    /// True if `area` strictly overlaps any boundary
    pub fn collides(&self, area: &Rect) -> bool {
        self.boundaries.iter().any(|b| area.overlaps(b))
    }

    /// Popup flags for a player box at `area`
    pub fn zone_flags(&self, area: &Rect) -> ZoneFlags {
        let mut flags = ZoneFlags::default();
        for zone in self.zones.iter().filter(|z| area.overlaps(&z.area)) {
            flags.set(zone.kind);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> WorldSettings {
        WorldSettings {
            cols: 4,
            rows: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_tiles_places_rects_on_grid() {
        #[rustfmt::skip]
        let tiles = [
            0, 15713, 0, 0,
            0, 0, 1001, 0,
            1002, 0, 0, 15713,
        ];
        let layout = MapLayout::from_tiles(&tiles, &small_settings()).unwrap();

        assert_eq!(
            layout.boundaries(),
            &[Rect::square(16.0, 0.0, 16.0), Rect::square(48.0, 32.0, 16.0)]
        );
        assert_eq!(layout.zones().len(), 2);
        assert_eq!(layout.zones()[0].kind, ZoneKind::Information);
        assert_eq!(layout.zones()[0].area, Rect::square(32.0, 16.0, 16.0));
        assert_eq!(layout.zones()[1].kind, ZoneKind::Chest);
        assert_eq!(layout.zones()[1].area, Rect::square(0.0, 32.0, 16.0));
    }

    #[test]
    fn test_wrong_layer_size_is_rejected() {
        let err = MapLayout::from_tiles(&[0, 0, 0], &small_settings()).unwrap_err();
        assert!(matches!(
            err,
            WorldError::LayerSize {
                expected: 12,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_from_json() {
        let layout =
            MapLayout::from_json("[0,0,0,0, 0,0,0,0, 0,0,0,15713]", &small_settings()).unwrap();
        assert_eq!(layout.boundaries().len(), 1);
        assert!(MapLayout::from_json("not json", &small_settings()).is_err());
    }

    #[test]
    fn test_zone_flags() {
        let layout = MapLayout::new(
            vec![],
            vec![
                ProximityZone {
                    kind: ZoneKind::Information,
                    area: Rect::square(32.0, 32.0, 16.0),
                },
                ProximityZone {
                    kind: ZoneKind::Chest,
                    area: Rect::square(96.0, 32.0, 16.0),
                },
            ],
        );

        let flags = layout.zone_flags(&Rect::square(40.0, 30.0, 16.0));
        assert!(flags.information);
        assert!(!flags.chest);
        assert!(flags.get(ZoneKind::Information));

        let none = layout.zone_flags(&Rect::square(48.0, 32.0, 16.0));
        assert_eq!(none, ZoneFlags::default());
    }
}
