//! Realtime Store - shared JSON document store
//!
//! This crate provides the store every game client talks to:
//! - `SharedStore` contract (subscribe / get / set / update / remove)
//! - In-memory document tree with path snapshots
//! - Anonymous sign-in tokens
//! - WebSocket JSON-RPC server and client

pub mod auth;
pub mod error;
pub mod path;
pub mod remote;
pub mod store;
pub mod subscriptions;
pub mod ws_server;

#[cfg(test)]
mod tests;

pub use auth::{AuthRegistry, Identity};
pub use error::StoreError;
pub use remote::RemoteStore;
pub use store::{MemoryStore, SharedStore, StoreConnection};
pub use subscriptions::{Subscription, SubscriptionId, SubscriptionManager};
pub use ws_server::StoreServer;
