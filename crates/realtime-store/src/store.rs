//! Shared store contract and the in-memory implementation
//!
//! The store is a JSON tree addressed by `/`-separated paths. Top-level
//! collections (`players`, `coins`, `profiles`, ...) live in a DashMap so
//! writers to different collections never contend.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    error::StoreError,
    path,
    subscriptions::{SubscriptionId, SubscriptionManager, Subscription},
};

/// Realtime document store as seen by one client connection.
///
/// Writes are last-writer-wins. `update` merges at the first level only;
/// writing `null` anywhere deletes that node.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Watch a path: initial value first, then a snapshot per change
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError>;

    /// Stop a subscription. Returns false if it was not active.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, StoreError>;

    /// Current value at a path (`null` if absent)
    async fn get(&self, path: &str) -> Result<Value, StoreError>;

    /// Replace the value at a path
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merge `fields` into the object at a path
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Delete a path. Removing an absent path succeeds.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Delete a path when this connection ends
    async fn remove_on_disconnect(&self, path: &str) -> Result<(), StoreError>;
}

/// Thread-safe in-memory document tree
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Top-level collections
    collections: Arc<DashMap<String, Value>>,
    subscriptions: Arc<SubscriptionManager>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a client connection with its own disconnect hooks
    pub fn connect(&self) -> StoreConnection {
        StoreConnection::new(self.clone())
    }

    /// Current value at a path
    pub fn get(&self, path: &str) -> Value {
        let segments = path::segments(path);
        match segments.split_first() {
            None => {
                let root: Map<String, Value> = self
                    .collections
                    .iter()
                    .map(|entry| (entry.key().clone(), entry.value().clone()))
                    .collect();
                if root.is_empty() {
                    Value::Null
                } else {
                    Value::Object(root)
                }
            }
            Some((head, rest)) => self
                .collections
                .get(*head)
                .and_then(|root| lookup(root.value(), rest).cloned())
                .unwrap_or(Value::Null),
        }
    }

    /// Replace the value at a path
    pub fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(path, move |node| *node = value)
    }

    /// Merge fields into the object at a path
    pub fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.mutate(path, move |node| {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                for (key, value) in fields {
                    map.insert(key, value);
                }
            }
        })
    }

    /// Delete a path
    pub fn remove(&self, path: &str) -> Result<(), StoreError> {
        let segments = path::segments(path);
        let (head, rest) = segments
            .split_first()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        match rest.split_last() {
            None => {
                self.collections.remove(*head);
            }
            Some((leaf, parents)) => {
                if let Some(mut root) = self.collections.get_mut(*head) {
                    if let Some(Value::Object(map)) = lookup_mut(root.value_mut(), parents) {
                        map.remove(*leaf);
                    }
                    prune(root.value_mut());
                }
                self.collections.remove_if(*head, |_, value| value.is_null());
            }
        }

        self.notify(path);
        Ok(())
    }

    /// Watch a path
    pub fn subscribe(&self, path: &str) -> Subscription {
        let path = path::normalize(path);
        // Register before reading so no write can fall between the two
        let (id, receiver) = self.subscriptions.subscribe(&path);
        let initial = self.get(&path);
        Subscription::new(id, path, initial, receiver)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Active subscription count (all connections)
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    /// Run `op` on the node at `path`, creating parents as needed
    fn mutate<F>(&self, path: &str, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Value),
    {
        let segments = path::segments(path);
        let (head, rest) = segments
            .split_first()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        {
            let mut root = self
                .collections
                .entry(head.to_string())
                .or_insert(Value::Null);
            op(node_mut(root.value_mut(), rest));
            prune(root.value_mut());
        }
        self.collections.remove_if(*head, |_, value| value.is_null());

        self.notify(path);
        Ok(())
    }

    fn notify(&self, changed: &str) {
        tracing::debug!("Store write at {:?}", changed);
        self.subscriptions
            .notify_path_change(changed, |watched| self.get(watched));
    }
}

fn lookup<'a>(mut node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    for segment in segments {
        node = node.as_object()?.get(*segment)?;
    }
    Some(node)
}

fn lookup_mut<'a>(mut node: &'a mut Value, segments: &[&str]) -> Option<&'a mut Value> {
    for segment in segments {
        node = node.as_object_mut()?.get_mut(*segment)?;
    }
    Some(node)
}

fn node_mut<'a>(mut node: &'a mut Value, segments: &[&str]) -> &'a mut Value {
    for segment in segments {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = &mut node[*segment];
    }
    node
}

/// Drop nulls and empty objects so deleted nodes read back as absent
fn prune(value: &mut Value) {
    let empty = match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                prune(child);
            }
            map.retain(|_, child| !child.is_null());
            map.is_empty()
        }
        _ => false,
    };
    if empty {
        *value = Value::Null;
    }
}

/// One client's view of a `MemoryStore`.
///
/// Tracks the paths armed with `remove_on_disconnect` and the subscriptions
/// it opened; both are cleaned up on `disconnect` or drop.
pub struct StoreConnection {
    store: MemoryStore,
    on_disconnect: Mutex<Vec<String>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl StoreConnection {
    fn new(store: MemoryStore) -> Self {
        Self {
            store,
            on_disconnect: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Run armed removals and close this connection's subscriptions
    pub fn disconnect(&self) {
        let paths: Vec<String> = std::mem::take(&mut *self.on_disconnect.lock());
        for path in paths {
            match self.store.remove(&path) {
                Ok(()) => tracing::debug!("Removed {:?} on disconnect", path),
                Err(e) => tracing::warn!("Disconnect cleanup of {:?} failed: {}", path, e),
            }
        }

        let ids: Vec<SubscriptionId> = std::mem::take(&mut *self.subscriptions.lock());
        for id in ids {
            self.store.unsubscribe(id);
        }
    }
}

impl Drop for StoreConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl SharedStore for StoreConnection {
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let subscription = self.store.subscribe(path);
        self.subscriptions.lock().push(subscription.id());
        Ok(subscription)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, StoreError> {
        self.subscriptions.lock().retain(|&s| s != id);
        Ok(self.store.unsubscribe(id))
    }

    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        Ok(self.store.get(path))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.store.set(path, value)
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.store.update(path, fields)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.store.remove(path)
    }

    async fn remove_on_disconnect(&self, path: &str) -> Result<(), StoreError> {
        let path = path::normalize(path);
        if path.is_empty() {
            return Err(StoreError::InvalidPath(path));
        }
        self.on_disconnect.lock().push(path);
        Ok(())
    }
}
