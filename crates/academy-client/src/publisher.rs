//! State Publisher
//!
//! Two write paths into the shared store:
//! - debounced: position updates, only the newest one per quiet window lands
//! - immediate: coin pickups and teardown writes, executed in order by one
//!   worker task
//!
//! Failed writes are logged and never retried.

use academy_world::Direction;
use realtime_store::SharedStore;
use serde_json::{json, Map, Value};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{config::PublisherConfig, debounce::Debouncer};

/// Store path of a player record
pub fn player_path(player_id: &str) -> String {
    format!("players/{}", player_id)
}

/// Store path of a coin record
pub fn coin_path(coin_key: &str) -> String {
    format!("coins/{}", coin_key)
}

/// Position write for the debounced path
#[derive(Clone, Debug, PartialEq)]
pub struct PositionUpdate {
    pub player_id: String,
    pub x: f64,
    pub y: f64,
    pub direction: Direction,
}

impl PositionUpdate {
    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("x".into(), json!(self.x));
        fields.insert("y".into(), json!(self.y));
        fields.insert("direction".into(), json!(self.direction.as_str()));
        fields
    }
}

/// Write for the immediate path
#[derive(Clone, Debug, PartialEq)]
pub enum ImmediateWrite {
    /// Delete the coin, then store the player's new coin total
    CoinPickup {
        player_id: String,
        coin_key: String,
        coins: u64,
    },
    /// Merge fields into a record
    Update {
        path: String,
        fields: Map<String, Value>,
    },
    /// Delete a record
    Remove { path: String },
}

/// Debounced and immediate store writer
pub struct StatePublisher {
    positions: Debouncer<PositionUpdate>,
    immediate: mpsc::UnboundedSender<ImmediateWrite>,
    worker: JoinHandle<()>,
}

impl StatePublisher {
    /// Start the debounce task and the immediate-write worker
    pub fn spawn(store: Arc<dyn SharedStore>, config: &PublisherConfig) -> Self {
        let debounce_store = store.clone();
        let positions = Debouncer::spawn(
            Duration::from_millis(config.debounce_ms),
            move |update: PositionUpdate| {
                let store = debounce_store.clone();
                async move {
                    let path = player_path(&update.player_id);
                    match store.update(&path, update.fields()).await {
                        Ok(()) => tracing::debug!(
                            "Published position {:?} ({}, {})",
                            path,
                            update.x,
                            update.y
                        ),
                        Err(e) => tracing::warn!("Position write to {:?} failed: {}", path, e),
                    }
                }
            },
        );

        let (immediate, mut queue) = mpsc::unbounded_channel::<ImmediateWrite>();
        let worker = tokio::spawn(async move {
            while let Some(write) = queue.recv().await {
                execute(&*store, write).await;
            }
        });

        Self {
            positions,
            immediate,
            worker,
        }
    }

    /// Queue a position for the debounced path
    pub fn publish_position(&self, update: PositionUpdate) {
        if !self.positions.push(update) {
            tracing::warn!("Position publisher stopped; update dropped");
        }
    }

    /// Queue a write for the immediate path
    pub fn write_now(&self, write: ImmediateWrite) {
        if self.immediate.send(write).is_err() {
            tracing::warn!("Immediate writer stopped; write dropped");
        }
    }

    /// Record a coin pickup: delete `coins/{key}`, then set the new total
    pub fn pickup_coin(&self, player_id: &str, coin_key: &str, coins: u64) {
        self.write_now(ImmediateWrite::CoinPickup {
            player_id: player_id.to_string(),
            coin_key: coin_key.to_string(),
            coins,
        });
    }

    /// Stop publishing. A pending debounced position is dropped; queued
    /// immediate writes are flushed first.
    pub async fn shutdown(self) {
        self.positions.close().await;
        drop(self.immediate);
        let _ = self.worker.await;
    }
}

async fn execute(store: &dyn SharedStore, write: ImmediateWrite) {
    match write {
        ImmediateWrite::CoinPickup {
            player_id,
            coin_key,
            coins,
        } => {
            let coin = coin_path(&coin_key);
            if let Err(e) = store.remove(&coin).await {
                tracing::warn!("Coin removal {:?} failed: {}", coin, e);
                return;
            }
            let mut fields = Map::new();
            fields.insert("coins".into(), json!(coins));
            let player = player_path(&player_id);
            match store.update(&player, fields).await {
                Ok(()) => tracing::debug!("Coin {} collected by {} ({})", coin_key, player_id, coins),
                // The coin is already gone; nothing puts it back
                Err(e) => tracing::warn!("Coin count update for {:?} failed: {}", player, e),
            }
        }
        ImmediateWrite::Update { path, fields } => {
            if let Err(e) = store.update(&path, fields).await {
                tracing::warn!("Update of {:?} failed: {}", path, e);
            }
        }
        ImmediateWrite::Remove { path } => {
            if let Err(e) = store.remove(&path).await {
                tracing::warn!("Removal of {:?} failed: {}", path, e);
            }
        }
    }
}
