//! Input Sampler
//!
//! Tracks which arrow keys are held. The intended movement vector is
//! recomputed from the held set on every key transition and every frame,
//! so holding a key produces continuous movement.

use std::collections::HashSet;

/// Directional keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

impl ArrowKey {
    /// Parse a DOM-style key code (`ArrowUp`, ...)
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ArrowUp" => Some(Self::Up),
            "ArrowDown" => Some(Self::Down),
            "ArrowLeft" => Some(Self::Left),
            "ArrowRight" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Set of currently held arrow keys
#[derive(Clone, Debug, Default)]
pub struct InputSampler {
    pressed: HashSet<ArrowKey>,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press. Returns false for auto-repeat of a held key.
    pub fn key_down(&mut self, key: ArrowKey) -> bool {
        self.pressed.insert(key)
    }

    /// Record a key release. Returns false if the key was not held.
    pub fn key_up(&mut self, key: ArrowKey) -> bool {
        self.pressed.remove(&key)
    }

    /// Release everything (focus lost)
    pub fn release_all(&mut self) {
        self.pressed.clear();
    }

    pub fn is_pressed(&self, key: ArrowKey) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_idle(&self) -> bool {
        self.pressed.is_empty()
    }

    /// Raw per-axis contributions: each axis is -step, 0 or +step.
    /// Opposing keys cancel out.
    pub fn raw_vector(&self, step: f64) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;

        if self.is_pressed(ArrowKey::Up) {
            dy -= step;
        }
        if self.is_pressed(ArrowKey::Down) {
            dy += step;
        }
        if self.is_pressed(ArrowKey::Left) {
            dx -= step;
        }
        if self.is_pressed(ArrowKey::Right) {
            dx += step;
        }

        (dx, dy)
    }

    /// Movement for this frame, normalized to length `step`
    pub fn step_vector(&self, step: f64) -> (f64, f64) {
        let (dx, dy) = self.raw_vector(step);
        crate::movement::normalize(dx, dy, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes() {
        assert_eq!(ArrowKey::from_code("ArrowLeft"), Some(ArrowKey::Left));
        assert_eq!(ArrowKey::from_code("KeyM"), None);
    }

    #[test]
    fn test_press_and_release() {
        let mut input = InputSampler::new();
        assert!(input.key_down(ArrowKey::Up));
        assert!(!input.key_down(ArrowKey::Up));
        assert_eq!(input.raw_vector(3.0), (0.0, -3.0));

        assert!(input.key_up(ArrowKey::Up));
        assert!(!input.key_up(ArrowKey::Up));
        assert!(input.is_idle());
        assert_eq!(input.raw_vector(3.0), (0.0, 0.0));
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut input = InputSampler::new();
        input.key_down(ArrowKey::Left);
        input.key_down(ArrowKey::Right);
        input.key_down(ArrowKey::Down);
        assert_eq!(input.raw_vector(3.0), (0.0, 3.0));
        assert_eq!(input.step_vector(3.0), (0.0, 3.0));

        input.release_all();
        assert_eq!(input.step_vector(3.0), (0.0, 0.0));
    }

    #[test]
    fn test_every_combination_moves_at_base_step() {
        let keys = [ArrowKey::Up, ArrowKey::Down, ArrowKey::Left, ArrowKey::Right];
        for mask in 0u8..16 {
            let mut input = InputSampler::new();
            for (bit, key) in keys.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    input.key_down(*key);
                }
            }

            let (raw_x, raw_y) = input.raw_vector(3.0);
            let (dx, dy) = input.step_vector(3.0);
            let length = dx.hypot(dy);
            if raw_x == 0.0 && raw_y == 0.0 {
                assert_eq!(length, 0.0);
            } else {
                assert!((length - 3.0).abs() < 1e-9, "mask {mask}: {length}");
            }
        }
    }
}
