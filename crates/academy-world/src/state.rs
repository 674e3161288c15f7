//! World State
//!
//! Records mirrored in the shared store under `players/{id}` and
//! `coins/{key}`.

use serde::{Deserialize, Serialize};

/// Eight-way facing direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    /// Facing for a movement delta (screen space, +Y is down).
    ///
    /// Returns None for a zero delta; the caller keeps its previous facing.
    pub fn from_delta(dx: f64, dy: f64) -> Option<Self> {
        use std::cmp::Ordering::{Greater, Less};

        let direction = match (dx.partial_cmp(&0.0)?, dy.partial_cmp(&0.0)?) {
            (Greater, Less) => Self::UpRight,
            (Greater, Greater) => Self::DownRight,
            (Less, Less) => Self::UpLeft,
            (Less, Greater) => Self::DownLeft,
            (Greater, _) => Self::Right,
            (Less, _) => Self::Left,
            (_, Greater) => Self::Down,
            (_, Less) => Self::Up,
            _ => return None,
        };
        Some(direction)
    }

    /// Wire name, as stored in the player record
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::UpLeft => "up-left",
            Self::UpRight => "up-right",
            Self::DownLeft => "down-left",
            Self::DownRight => "down-right",
        }
    }
}

/// Player record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Stable player identifier (the signed-in uid)
    pub id: String,
    /// Display name
    pub name: String,
    /// Facing direction
    pub direction: Direction,
    /// Sprite colour tag
    pub color: String,
    /// Horizontal position in map pixels
    pub x: f64,
    /// Vertical position in map pixels
    pub y: f64,
    /// Coins collected this session
    #[serde(default)]
    pub coins: u64,
}

/// Coin record
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub x: f64,
    pub y: f64,
}

impl Coin {
    /// Store key for this coin
    pub fn key(&self) -> String {
        coin_key(self.x, self.y)
    }
}

/// Lookup key for a coin at (x, y): `"{x}x{y}"`.
///
/// Whole numbers print without a fractional part, so a player resting on
/// integer coordinates matches coins placed on integer coordinates.
pub fn coin_key(x: f64, y: f64) -> String {
    format!("{}x{}", format_coord(x), format_coord(y))
}

fn format_coord(value: f64) -> String {
    // -0 and 0 must share a key
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}
