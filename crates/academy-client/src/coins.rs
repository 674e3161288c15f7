//! Coin Placer
//!
//! Drops a coin at a random spot every few seconds while the session runs.

use academy_world::{Coin, WorldSettings};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use realtime_store::SharedStore;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{config::COIN_INTERVALS_MS, publisher::coin_path};

/// Random whole-pixel spot inside the map, leaving room for the sprite
pub fn random_coin<R: Rng + ?Sized>(rng: &mut R, settings: &WorldSettings) -> Coin {
    let span_x = (settings.map_width() - settings.sprite_width).max(1.0) as u64;
    let span_y = (settings.map_height() - settings.sprite_height).max(1.0) as u64;
    Coin {
        x: rng.gen_range(0..span_x) as f64,
        y: rng.gen_range(0..span_y) as f64,
    }
}

/// Background coin placement task
pub struct CoinPlacer {
    task: JoinHandle<()>,
}

impl CoinPlacer {
    /// Start placing coins. An empty interval list falls back to the
    /// default intervals.
    pub fn spawn(
        store: Arc<dyn SharedStore>,
        settings: WorldSettings,
        intervals_ms: Vec<u64>,
    ) -> Self {
        let intervals = if intervals_ms.is_empty() {
            COIN_INTERVALS_MS.to_vec()
        } else {
            intervals_ms
        };

        let task = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            loop {
                let delay = intervals.choose(&mut rng).copied().unwrap_or(COIN_INTERVALS_MS[0]);
                tokio::time::sleep(Duration::from_millis(delay)).await;

                let coin = random_coin(&mut rng, &settings);
                let path = coin_path(&coin.key());
                match store.set(&path, json!(coin)).await {
                    Ok(()) => tracing::debug!("Placed coin at ({}, {})", coin.x, coin.y),
                    Err(e) => tracing::warn!("Coin placement at {:?} failed: {}", path, e),
                }
            }
        });

        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for CoinPlacer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realtime_store::MemoryStore;
    use serde_json::Value;

    #[test]
    fn test_random_coin_in_bounds() {
        let settings = WorldSettings::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let coin = random_coin(&mut rng, &settings);
            assert!(coin.x >= 0.0 && coin.x < 2240.0 - 32.0);
            assert!(coin.y >= 0.0 && coin.y < 1280.0 - 32.0);
            assert_eq!(coin.x.fract(), 0.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_places_coins_on_interval() {
        let store = MemoryStore::new();
        let placer = CoinPlacer::spawn(
            Arc::new(store.connect()),
            WorldSettings::default(),
            vec![2000],
        );

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(store.get("coins"), Value::Null);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let coins = store.get("coins");
        let coins = coins.as_object().unwrap();
        assert_eq!(coins.len(), 1);

        let (key, value) = coins.iter().next().unwrap();
        let coin: Coin = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(&coin.key(), key);

        placer.stop();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(store.get("coins").as_object().unwrap().len(), 1);
    }
}
