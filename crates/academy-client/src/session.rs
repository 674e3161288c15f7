//! Game Session
//!
//! Local state of one connected player: held keys, the local player record,
//! mirrors of remote players and coins, the camera and popup flags.
//! A session is owned by a single task (the frame loop); every input and
//! snapshot is applied in arrival order, so nothing here is locked.

use academy_world::{
    coin_key, resolve_movement, ArrowKey, Camera, Coin, InputSampler, MapLayout, MoveOutcome,
    MovementState, Player, ZoneFlags,
};
use realtime_store::{SharedStore, Subscription, SubscriptionId};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use crate::{
    coins::CoinPlacer,
    config::SessionConfig,
    error::SessionError,
    names,
    publisher::{player_path, ImmediateWrite, PositionUpdate, StatePublisher},
};

/// Inputs the session reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    KeyDown(ArrowKey),
    KeyUp(ArrowKey),
    /// Window lost focus: release every key
    FocusLost,
    Resize { width: f64, height: f64 },
    ToggleMinimap,
    Rename(String),
    PlayersSnapshot(Value),
    CoinsSnapshot(Value),
    /// Stop the frame loop and tear the session down
    Shutdown,
}

/// Store feeds the session listens to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedKind {
    Players,
    Coins,
}

impl FeedKind {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Players => "players",
            Self::Coins => "coins",
        }
    }

    /// Wrap a snapshot of this feed as a session event
    pub fn event(&self, snapshot: Value) -> SessionEvent {
        match self {
            Self::Players => SessionEvent::PlayersSnapshot(snapshot),
            Self::Coins => SessionEvent::CoinsSnapshot(snapshot),
        }
    }
}

/// Render-ready copy of the session state
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub player: Option<Player>,
    pub others: Vec<Player>,
    pub coins: Vec<Coin>,
    pub camera: Camera,
    pub walking: bool,
    pub zones: ZoneFlags,
    pub minimap: bool,
}

/// One joined player
pub struct GameSession {
    store: Arc<dyn SharedStore>,
    player_id: String,
    config: SessionConfig,
    map: MapLayout,
    camera: Camera,
    input: InputSampler,
    /// Local player; None until the store mirrors it back
    local: Option<Player>,
    /// Remote players by id
    others: BTreeMap<String, Player>,
    /// Coins by store key
    coins: HashMap<String, Coin>,
    /// Keys picked up locally, ignored until a snapshot confirms removal
    collected: HashSet<String>,
    walking: bool,
    zones: ZoneFlags,
    minimap: bool,
    publisher: StatePublisher,
    coin_placer: Option<CoinPlacer>,
    feeds: Vec<(FeedKind, Subscription)>,
    feed_ids: Vec<SubscriptionId>,
}

impl GameSession {
    /// Join the world as `player_id`:
    /// 1. write a fresh player record at the spawn point
    /// 2. arm its removal for when the connection drops
    /// 3. subscribe to players and coins
    /// 4. start the coin placer
    pub async fn join(
        store: Arc<dyn SharedStore>,
        player_id: &str,
        map: MapLayout,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let player = names::new_player(player_id, &mut rand::thread_rng());
        let path = player_path(player_id);

        store.set(&path, serde_json::to_value(&player)?).await?;
        store.remove_on_disconnect(&path).await?;

        let mut feeds = Vec::new();
        for kind in [FeedKind::Players, FeedKind::Coins] {
            feeds.push((kind, store.subscribe(kind.path()).await?));
        }
        let feed_ids = feeds.iter().map(|(_, feed)| feed.id()).collect();

        let publisher = StatePublisher::spawn(store.clone(), &config.publisher);
        let coin_placer = config.spawn_coins.then(|| {
            CoinPlacer::spawn(
                store.clone(),
                config.world.clone(),
                config.coin_intervals_ms.clone(),
            )
        });
        let camera = Camera::new(&config.world, config.viewport_width, config.viewport_height);

        tracing::info!(
            "Player {} joined as {:?} ({})",
            player_id,
            player.name,
            player.color
        );

        Ok(Self {
            store,
            player_id: player_id.to_string(),
            config,
            map,
            camera,
            input: InputSampler::new(),
            local: None,
            others: BTreeMap::new(),
            coins: HashMap::new(),
            collected: HashSet::new(),
            walking: false,
            zones: ZoneFlags::default(),
            minimap: false,
            publisher,
            coin_placer,
            feeds,
            feed_ids,
        })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Hand the store subscriptions to whoever pumps them into the session
    pub fn take_feeds(&mut self) -> Vec<(FeedKind, Subscription)> {
        std::mem::take(&mut self.feeds)
    }

    /// Apply one event. Shutdown is handled by the frame loop.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::KeyDown(key) => {
                self.input.key_down(key);
                self.process_movement();
            }
            SessionEvent::KeyUp(key) => {
                self.input.key_up(key);
                self.process_movement();
            }
            SessionEvent::FocusLost => {
                self.input.release_all();
                self.process_movement();
            }
            SessionEvent::Resize { width, height } => self.resize(width, height),
            SessionEvent::ToggleMinimap => {
                self.minimap = !self.minimap;
            }
            SessionEvent::Rename(name) => {
                self.rename(&name);
            }
            SessionEvent::PlayersSnapshot(snapshot) => self.apply_players(&snapshot),
            SessionEvent::CoinsSnapshot(snapshot) => self.apply_coins(&snapshot),
            SessionEvent::Shutdown => {}
        }
    }

    /// Per-frame work: continuous movement and camera smoothing
    pub fn tick(&mut self) {
        self.process_movement();

        if self.config.smooth_camera {
            if let Some(player) = &self.local {
                self.camera.follow(player.x, player.y);
            }
        }
    }

    /// Resolve one step from the held keys.
    ///
    /// Returns None (and does nothing) while the local record is missing.
    pub fn process_movement(&mut self) -> Option<MoveOutcome> {
        let player = self.local.as_mut()?;

        let delta = self.input.step_vector(self.config.world.base_step);
        let outcome = resolve_movement(
            MovementState::from(&*player),
            delta,
            &self.camera,
            &self.map,
            &self.config.world,
        );

        player.x = outcome.state.x;
        player.y = outcome.state.y;
        player.direction = outcome.state.direction;
        self.walking = outcome.walking;
        self.zones = outcome.zones;

        if outcome.moved {
            if !self.config.smooth_camera {
                self.camera = outcome.camera;
            }
            self.publisher.publish_position(PositionUpdate {
                player_id: self.player_id.clone(),
                x: player.x,
                y: player.y,
                direction: player.direction,
            });
            self.try_pickup();
        }

        Some(outcome)
    }

    /// Collect the coin under the player, if any
    fn try_pickup(&mut self) {
        let Some(player) = self.local.as_mut() else {
            return;
        };
        let key = coin_key(player.x, player.y);
        if self.coins.remove(&key).is_none() {
            return;
        }

        self.collected.insert(key.clone());
        player.coins += 1;
        tracing::debug!("Picked up coin {} ({} total)", key, player.coins);
        self.publisher.pickup_coin(&self.player_id, &key, player.coins);
    }

    /// Replace the remote player mirror. The local record takes position and
    /// facing from local state and everything else from the store.
    pub fn apply_players(&mut self, snapshot: &Value) {
        let mut records: BTreeMap<String, Player> = parse_records(snapshot);

        match records.remove(&self.player_id) {
            Some(mirrored) => match self.local.as_mut() {
                Some(local) => {
                    local.name = mirrored.name;
                    local.color = mirrored.color;
                    local.coins = local.coins.max(mirrored.coins);
                }
                None => {
                    // First sighting: bring the player into view
                    self.camera.center_on(mirrored.x, mirrored.y);
                    self.local = Some(mirrored);
                }
            },
            None => {
                if self.local.take().is_some() {
                    tracing::warn!("Player record {} was removed", self.player_id);
                    self.walking = false;
                }
            }
        }

        self.others = records;
    }

    /// Replace the coin mirror
    pub fn apply_coins(&mut self, snapshot: &Value) {
        let records: HashMap<String, Coin> = parse_records(snapshot);

        // A key leaves `collected` once the store confirms it is gone
        self.collected.retain(|key| records.contains_key(key));
        self.coins = records
            .into_iter()
            .filter(|(key, _)| !self.collected.contains(key))
            .collect();
    }

    /// Viewport changed size
    pub fn resize(&mut self, width: f64, height: f64) {
        self.camera.resize(width, height);
        match &self.local {
            Some(player) => self.camera.center_on(player.x, player.y),
            None => self.camera.clamp(),
        }
    }

    /// Change the display name. Returns false for a blank name.
    pub fn rename(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if let Some(player) = self.local.as_mut() {
            player.name = name.to_string();
        }

        let mut fields = Map::new();
        fields.insert("name".into(), json!(name));
        self.publisher.write_now(ImmediateWrite::Update {
            path: player_path(&self.player_id),
            fields,
        });
        true
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn zones(&self) -> ZoneFlags {
        self.zones
    }

    pub fn is_walking(&self) -> bool {
        self.walking
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            player: self.local.clone(),
            others: self.others.values().cloned().collect(),
            coins: self.coins.values().copied().collect(),
            camera: self.camera,
            walking: self.walking,
            zones: self.zones,
            minimap: self.minimap,
        }
    }

    /// Leave the world. The pending debounced position is dropped; the
    /// player record is removed through the immediate path.
    pub async fn teardown(mut self) {
        if let Some(placer) = self.coin_placer.take() {
            placer.stop();
        }

        self.publisher.write_now(ImmediateWrite::Remove {
            path: player_path(&self.player_id),
        });
        self.publisher.shutdown().await;

        for id in self.feed_ids {
            if let Err(e) = self.store.unsubscribe(id).await {
                tracing::debug!("Unsubscribe {} failed: {}", id, e);
            }
        }

        tracing::info!("Player {} left", self.player_id);
    }
}

/// Decode each child of an object snapshot, skipping malformed entries
fn parse_records<T, C>(snapshot: &Value) -> C
where
    T: DeserializeOwned,
    C: FromIterator<(String, T)>,
{
    snapshot
        .as_object()
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| match serde_json::from_value(value.clone()) {
            Ok(record) => Some((key.clone(), record)),
            Err(e) => {
                tracing::debug!("Skipping malformed record {:?}: {}", key, e);
                None
            }
        })
        .collect()
}
