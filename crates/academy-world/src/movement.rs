//! Movement Resolver
//!
//! One resolution step:
//! 1. clamp the attempted position to the playable area
//! 2. commit X unless the X-only move hits a boundary
//! 3. commit Y (from the committed X) unless it hits a boundary
//! 4. derive facing from the requested delta, refresh zone flags
//! 5. recenter the camera if the player moved
//!
//! Resolving X before Y lets the player slide along a wall when only one
//! axis is blocked.

use serde::{Deserialize, Serialize};

use crate::{
    camera::Camera,
    geometry::Rect,
    map::{MapLayout, ZoneFlags},
    settings::{WorldSettings, ZoneProbe},
    state::{Direction, Player},
};

/// Position and facing of the local player
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    pub x: f64,
    pub y: f64,
    pub direction: Direction,
}

impl MovementState {
    pub fn new(x: f64, y: f64, direction: Direction) -> Self {
        Self { x, y, direction }
    }
}

impl From<&Player> for MovementState {
    fn from(player: &Player) -> Self {
        Self::new(player.x, player.y, player.direction)
    }
}

/// Result of one resolution step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveOutcome {
    /// Resolved position and facing
    pub state: MovementState,
    /// Camera after recentering (unchanged if the player did not move)
    pub camera: Camera,
    /// Position changed on at least one axis
    pub moved: bool,
    /// Walk animation flag
    pub walking: bool,
    /// Popup flags at the probe position
    pub zones: ZoneFlags,
}

/// Scale a non-zero vector to length `step` so diagonals are not faster
/// than straight moves.
pub fn normalize(dx: f64, dy: f64, step: f64) -> (f64, f64) {
    if dx == 0.0 && dy == 0.0 {
        return (0.0, 0.0);
    }
    let magnitude = dx.hypot(dy);
    (dx / magnitude * step, dy / magnitude * step)
}

/// Resolve one movement step of `delta` (already normalized)
pub fn resolve_movement(
    current: MovementState,
    delta: (f64, f64),
    camera: &Camera,
    map: &MapLayout,
    settings: &WorldSettings,
) -> MoveOutcome {
    let (dx, dy) = delta;
    let tile = settings.tile_size;

    // Attempt, clamped to the playable area
    let area = camera.playable_area(tile);
    let attempt_x = clamp_axis(current.x + dx, area.x, area.x + area.width);
    let attempt_y = clamp_axis(current.y + dy, area.y, area.y + area.height);

    // Axis-separated collision
    let x = if map.collides(&Rect::square(attempt_x, current.y, tile)) {
        current.x
    } else {
        attempt_x
    };
    let y = if map.collides(&Rect::square(x, attempt_y, tile)) {
        current.y
    } else {
        attempt_y
    };

    let probe_y = match settings.zone_probe {
        ZoneProbe::AttemptedY => attempt_y,
        ZoneProbe::Resolved => y,
    };
    let zones = map.zone_flags(&Rect::square(x, probe_y, tile));

    // Facing follows the request, not the outcome
    let direction = Direction::from_delta(dx, dy).unwrap_or(current.direction);

    let moved = x != current.x || y != current.y;
    let mut camera = *camera;
    if moved {
        camera.center_on(x, y);
    }

    MoveOutcome {
        state: MovementState::new(x, y, direction),
        camera,
        moved,
        walking: moved && (dx != 0.0 || dy != 0.0),
        zones,
    }
}

fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{ProximityZone, ZoneKind};

    const STEP: f64 = 3.0;

    fn settings() -> WorldSettings {
        WorldSettings::default()
    }

    /// Camera at the top-left corner: playable area starts at (0, 0)
    fn corner_camera() -> Camera {
        Camera::with_offset(&settings(), 1920.0, 1065.0, 0.0, 0.0)
    }

    fn walls(rects: &[Rect]) -> MapLayout {
        MapLayout::new(rects.to_vec(), vec![])
    }

    fn step(state: MovementState, delta: (f64, f64), map: &MapLayout) -> MoveOutcome {
        resolve_movement(state, delta, &corner_camera(), map, &settings())
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(0.0, 0.0, STEP), (0.0, 0.0));
        assert_eq!(normalize(STEP, 0.0, STEP), (STEP, 0.0));

        let (dx, dy) = normalize(STEP, -STEP, STEP);
        let component = STEP / 2f64.sqrt();
        assert!((dx - component).abs() < 1e-9);
        assert!((dy + component).abs() < 1e-9);
        assert!((dx.hypot(dy) - STEP).abs() < 1e-9);
    }

    #[test]
    fn test_idle_step_keeps_position_and_facing() {
        let start = MovementState::new(320.0, 380.0, Direction::Left);
        let camera = corner_camera();
        let outcome = resolve_movement(start, (0.0, 0.0), &camera, &MapLayout::default(), &settings());

        assert_eq!(outcome.state, start);
        assert!(!outcome.moved);
        assert!(!outcome.walking);
        assert_eq!(outcome.camera, camera);
    }

    #[test]
    fn test_free_move_recenters_camera() {
        let start = MovementState::new(320.0, 380.0, Direction::Right);
        let outcome = step(start, (0.0, STEP), &MapLayout::default());

        assert_eq!(outcome.state, MovementState::new(320.0, 383.0, Direction::Down));
        assert!(outcome.moved);
        assert!(outcome.walking);

        let mut expected = corner_camera();
        expected.center_on(320.0, 383.0);
        assert_eq!(outcome.camera, expected);
    }

    #[test]
    fn test_diagonal_up_right() {
        let start = MovementState::new(320.0, 380.0, Direction::Right);
        let delta = normalize(STEP, -STEP, STEP);
        let outcome = step(start, delta, &MapLayout::default());

        assert_eq!(outcome.state.direction, Direction::UpRight);
        let moved_x = outcome.state.x - start.x;
        let moved_y = outcome.state.y - start.y;
        assert!((moved_x - STEP / 2f64.sqrt()).abs() < 1e-9);
        assert!((moved_y + STEP / 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_player_stops_flush_against_wall() {
        let map = walls(&[Rect::square(160.0, 160.0, 16.0)]);
        let mut state = MovementState::new(130.0, 160.0, Direction::Right);

        for _ in 0..20 {
            let before = state.x;
            let outcome = step(state, (STEP, 0.0), &map);
            let overlap = map.collides(&Rect::square(before + STEP, state.y, 16.0));
            if overlap {
                assert_eq!(outcome.state.x, before);
                assert!(!outcome.walking);
            }
            state = outcome.state;
        }

        assert_eq!(state.x, 142.0);
        assert!(state.x + 16.0 <= 160.0);
        assert_eq!(state.direction, Direction::Right);
    }

    #[test]
    fn test_blocked_from_144() {
        let map = walls(&[Rect::square(160.0, 160.0, 16.0)]);
        let start = MovementState::new(144.0, 160.0, Direction::Right);
        let outcome = step(start, (STEP, 0.0), &map);

        assert_eq!(outcome.state.x, 144.0);
        assert!(!outcome.moved);
        assert!(!outcome.walking);
        // Facing still follows the request
        assert_eq!(outcome.state.direction, Direction::Right);
    }

    #[test]
    fn test_slides_along_wall() {
        // Wall to the right; moving down-right only moves down
        let map = walls(&[Rect::new(160.0, 0.0, 16.0, 1000.0)]);
        let start = MovementState::new(144.0, 300.0, Direction::Right);
        let delta = normalize(STEP, STEP, STEP);
        let outcome = step(start, delta, &map);

        assert_eq!(outcome.state.x, 144.0);
        assert!(outcome.state.y > 300.0);
        assert!(outcome.moved);
        assert_eq!(outcome.state.direction, Direction::DownRight);
    }

    #[test]
    fn test_y_uses_resolved_x() {
        // Moving up-left into a corner: X is blocked, then Y is tested at the
        // starting X where the ceiling tile is not above the player.
        let map = walls(&[
            Rect::square(112.0, 200.0, 16.0), // left of player
            Rect::square(112.0, 184.0, 16.0), // up-left diagonal
        ]);
        let start = MovementState::new(128.0, 200.0, Direction::Right);
        let outcome = step(start, (-STEP, -STEP), &map);

        assert_eq!(outcome.state.x, 128.0);
        assert_eq!(outcome.state.y, 197.0);
    }

    #[test]
    fn test_axis_blocking_property() {
        let map = walls(&[
            Rect::square(160.0, 160.0, 16.0),
            Rect::square(200.0, 120.0, 16.0),
            Rect::new(240.0, 0.0, 16.0, 400.0),
        ]);

        for ix in 0..40 {
            for iy in 0..40 {
                let x = 100.0 + ix as f64 * 4.5;
                let y = 80.0 + iy as f64 * 4.5;
                let start = MovementState::new(x, y, Direction::Right);
                if map.collides(&Rect::square(x, y, 16.0)) {
                    continue;
                }
                for &(dx, dy) in &[(STEP, 0.0), (-STEP, 0.0), (0.0, STEP), (0.0, -STEP)] {
                    let outcome = step(start, (dx, dy), &map);
                    if dx != 0.0 && map.collides(&Rect::square(x + dx, y, 16.0)) {
                        assert_eq!(outcome.state.x, x);
                    }
                    if dy != 0.0 && map.collides(&Rect::square(x, y + dy, 16.0)) {
                        assert_eq!(outcome.state.y, y);
                    }
                    assert!(!map.collides(&Rect::square(
                        outcome.state.x,
                        outcome.state.y,
                        16.0
                    )));
                }
            }
        }
    }

    #[test]
    fn test_clamped_to_playable_area() {
        let start = MovementState::new(0.0, 0.0, Direction::Right);
        let outcome = step(start, (-STEP, -STEP), &MapLayout::default());
        assert_eq!((outcome.state.x, outcome.state.y), (0.0, 0.0));
        assert!(!outcome.moved);
        assert_eq!(outcome.state.direction, Direction::UpLeft);

        let edge = MovementState::new(2224.0, 1264.0, Direction::Right);
        let outcome = step(edge, (STEP, STEP), &MapLayout::default());
        assert_eq!((outcome.state.x, outcome.state.y), (2224.0, 1264.0));
    }

    fn zone_behind_wall() -> MapLayout {
        MapLayout::new(
            vec![Rect::square(100.0, 116.0, 16.0)],
            vec![ProximityZone {
                kind: ZoneKind::Chest,
                area: Rect::square(100.0, 116.0, 16.0),
            }],
        )
    }

    #[test]
    fn test_zone_probe_uses_attempted_y() {
        let start = MovementState::new(100.0, 100.0, Direction::Down);
        let outcome = step(start, (0.0, STEP), &zone_behind_wall());

        assert_eq!(outcome.state.y, 100.0);
        assert!(outcome.zones.chest);
    }

    #[test]
    fn test_zone_probe_resolved() {
        let settings = WorldSettings {
            zone_probe: ZoneProbe::Resolved,
            ..Default::default()
        };
        let start = MovementState::new(100.0, 100.0, Direction::Down);
        let outcome =
            resolve_movement(start, (0.0, STEP), &corner_camera(), &zone_behind_wall(), &settings);

        assert_eq!(outcome.state.y, 100.0);
        assert!(!outcome.zones.chest);
    }
}
