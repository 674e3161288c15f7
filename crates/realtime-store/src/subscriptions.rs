//! Subscription Manager - Manages path subscriptions
//!
//! Every subscription watches one path and receives the full snapshot of
//! that path after each write at, above or below it.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, broadcast::error::RecvError};

use crate::path;

/// Subscription ID
pub type SubscriptionId = u64;

/// Snapshots buffered per subscriber before it starts lagging
pub(crate) const CHANNEL_CAPACITY: usize = 64;

/// Subscription entry
#[derive(Clone, Debug)]
struct Watcher {
    path: String,
    sender: broadcast::Sender<Value>,
}

/// Manages path subscriptions
pub struct SubscriptionManager {
    /// Active subscriptions by ID
    subscriptions: DashMap<SubscriptionId, Watcher>,
    /// Subscriptions by path for efficient lookup
    path_subscriptions: DashMap<String, Vec<SubscriptionId>>,
    /// Next subscription ID
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            path_subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to snapshots of `path` (already normalized)
    pub fn subscribe(&self, path: &str) -> (SubscriptionId, broadcast::Receiver<Value>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);

        self.subscriptions.insert(
            id,
            Watcher {
                path: path.to_string(),
                sender,
            },
        );
        self.path_subscriptions
            .entry(path.to_string())
            .or_default()
            .push(id);

        tracing::debug!("Created subscription {} for path {:?}", id, path);

        (id, receiver)
    }

    /// Remove a subscription
    pub fn unsubscribe(&self, subscription_id: SubscriptionId) -> bool {
        let Some((_, watcher)) = self.subscriptions.remove(&subscription_id) else {
            return false;
        };

        let now_empty = match self.path_subscriptions.get_mut(&watcher.path) {
            Some(mut ids) => {
                ids.retain(|&id| id != subscription_id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.path_subscriptions
                .remove_if(&watcher.path, |_, ids| ids.is_empty());
        }

        tracing::debug!("Removed subscription {}", subscription_id);
        true
    }

    /// Push fresh snapshots to every subscription affected by a write at
    /// `changed`. `snapshot` reads the current value of a watched path.
    pub fn notify_path_change<F>(&self, changed: &str, snapshot: F)
    where
        F: Fn(&str) -> Value,
    {
        let affected: Vec<(String, Vec<SubscriptionId>)> = self
            .path_subscriptions
            .iter()
            .filter(|entry| path::related(entry.key(), changed))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut dead = Vec::new();
        for (watched, ids) in affected {
            let value = snapshot(&watched);
            for id in ids {
                if let Some(watcher) = self.subscriptions.get(&id) {
                    // No receivers left: the subscriber went away without unsubscribing
                    if watcher.sender.send(value.clone()).is_err() {
                        dead.push(id);
                    }
                }
            }
        }

        for id in dead {
            self.unsubscribe(id);
        }
    }

    /// Get subscription count
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Check if a subscription exists
    pub fn has_subscription(&self, subscription_id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&subscription_id)
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of snapshots for one path.
///
/// Yields the value at subscription time first (possibly `null`), then one
/// full snapshot per change.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    path: String,
    initial: Option<Value>,
    receiver: broadcast::Receiver<Value>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        path: String,
        initial: Value,
        receiver: broadcast::Receiver<Value>,
    ) -> Self {
        Self {
            id,
            path,
            initial: Some(initial),
            receiver,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Take the initial snapshot if it has not been yielded yet
    pub fn take_initial(&mut self) -> Option<Value> {
        self.initial.take()
    }

    /// Next snapshot, or None once the source is gone.
    ///
    /// Snapshots are complete, so a lagging receiver skips ahead to the
    /// newest one instead of failing.
    pub async fn next(&mut self) -> Option<Value> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        "Subscription {} on {:?} skipped {} snapshots",
                        self.id,
                        self.path,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_and_notify() {
        let manager = SubscriptionManager::new();

        let (sub_id, mut receiver) = manager.subscribe("players");
        assert_eq!(sub_id, 1);

        manager.notify_path_change("players/abc", |watched| json!({ "path": watched }));

        let value = receiver.recv().await.unwrap();
        assert_eq!(value, json!({ "path": "players" }));
    }

    #[tokio::test]
    async fn test_unrelated_paths_are_not_notified() {
        let manager = SubscriptionManager::new();
        let (_, mut players) = manager.subscribe("players/abc");

        manager.notify_path_change("players/def", |_| json!(1));
        manager.notify_path_change("coins", |_| json!(2));
        manager.notify_path_change("players", |_| json!(3));

        assert_eq!(players.recv().await.unwrap(), json!(3));
        assert!(players.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe() {
        let manager = SubscriptionManager::new();

        let (sub_id, _receiver) = manager.subscribe("coins");
        assert!(manager.has_subscription(sub_id));

        assert!(manager.unsubscribe(sub_id));
        assert!(!manager.has_subscription(sub_id));
        assert!(!manager.unsubscribe(sub_id));
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let manager = SubscriptionManager::new();
        let (sub_id, receiver) = manager.subscribe("coins");
        drop(receiver);

        manager.notify_path_change("coins/1x1", |_| Value::Null);
        assert!(!manager.has_subscription(sub_id));
        assert_eq!(manager.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_yields_initial_first() {
        let manager = SubscriptionManager::new();
        let (id, receiver) = manager.subscribe("coins");
        let mut subscription = Subscription::new(id, "coins".into(), Value::Null, receiver);

        manager.notify_path_change("coins", |_| json!({ "1x1": { "x": 1, "y": 1 } }));

        assert_eq!(subscription.next().await, Some(Value::Null));
        assert_eq!(
            subscription.next().await,
            Some(json!({ "1x1": { "x": 1, "y": 1 } }))
        );
    }
}
