//! Player names and colours

use academy_world::{
    constants::{SPAWN_X, SPAWN_Y},
    Direction, Player,
};
use rand::{seq::SliceRandom, Rng};

const PREFIXES: [&str; 16] = [
    "COOL", "SUPER", "HIP", "SMUG", "SILKY", "GOOD", "SAFE", "DEAR", "DAMP", "WARM", "RICH", "LONG",
    "DARK", "SOFT", "BUFF", "DOPE",
];

const ANIMALS: [&str; 15] = [
    "BEAR", "DOG", "CAT", "FOX", "LAMB", "LION", "BOAR", "GOAT", "VOLE", "SEAL", "PUMA", "MULE",
    "BULL", "BIRD", "BUG",
];

/// Sprite colour tags
pub const PLAYER_COLORS: [&str; 6] = ["blue", "red", "orange", "yellow", "green", "purple"];

/// Random "PREFIX ANIMAL" display name
pub fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = PREFIXES.choose(rng).copied().unwrap_or("COOL");
    let animal = ANIMALS.choose(rng).copied().unwrap_or("CAT");
    format!("{} {}", prefix, animal)
}

/// Random sprite colour
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    PLAYER_COLORS.choose(rng).copied().unwrap_or("blue").to_string()
}

/// Fresh player record at the spawn point
pub fn new_player<R: Rng + ?Sized>(id: &str, rng: &mut R) -> Player {
    Player {
        id: id.to_string(),
        name: random_name(rng),
        direction: Direction::Right,
        color: random_color(rng),
        x: SPAWN_X,
        y: SPAWN_Y,
        coins: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let name = random_name(&mut rng);
            let (prefix, animal) = name.split_once(' ').unwrap();
            assert!(PREFIXES.contains(&prefix));
            assert!(ANIMALS.contains(&animal));
        }
    }

    #[test]
    fn test_new_player_spawns_facing_right() {
        let player = new_player("uid-1", &mut rand::thread_rng());
        assert_eq!(player.id, "uid-1");
        assert_eq!((player.x, player.y), (320.0, 380.0));
        assert_eq!(player.direction, Direction::Right);
        assert_eq!(player.coins, 0);
        assert!(PLAYER_COLORS.contains(&player.color.as_str()));
    }
}
