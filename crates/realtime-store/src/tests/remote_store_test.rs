//! RemoteStore <-> StoreServer Tests
//!
//! Runs the WebSocket server on an ephemeral port and drives it through the
//! client:
//! - anonymous sign-in
//! - reads and writes landing in the server's MemoryStore
//! - snapshots pushed to remote subscriptions
//! - remove-on-disconnect when the socket goes away

use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, time::timeout};

use crate::{
    auth::AuthRegistry,
    error::StoreError,
    remote::RemoteStore,
    store::{MemoryStore, SharedStore},
    ws_server::StoreServer,
};

const WAIT: Duration = Duration::from_secs(5);

/// Start a server on 127.0.0.1:0 and return its store, auth and URL
async fn start_server() -> (MemoryStore, AuthRegistry, String) {
    let store = MemoryStore::new();
    let auth = AuthRegistry::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(StoreServer::new(store.clone(), auth.clone()).serve(listener));

    (store, auth, format!("ws://{}", addr))
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

/// Poll until `check` passes or the wait expires
async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_sign_in_over_websocket() {
    let (_store, auth, url) = start_server().await;
    let remote = RemoteStore::connect(&url).await.unwrap();

    let identity = remote.sign_in_anonymously().await.unwrap();

    assert_eq!(auth.verify(&identity.token).unwrap(), identity.uid);
}

#[tokio::test]
async fn test_writes_reach_server_store() {
    let (store, _auth, url) = start_server().await;
    let remote = RemoteStore::connect(&url).await.unwrap();

    remote
        .set("players/p1", json!({ "name": "COOL CAT", "x": 320, "y": 380 }))
        .await
        .unwrap();
    remote
        .update("players/p1", fields(json!({ "x": 323, "direction": "right" })))
        .await
        .unwrap();

    assert_eq!(
        store.get("players/p1"),
        json!({ "name": "COOL CAT", "x": 323, "y": 380, "direction": "right" })
    );
    assert_eq!(remote.get("players/p1/x").await.unwrap(), json!(323));

    remote.remove("players/p1").await.unwrap();
    remote.remove("players/p1").await.unwrap();
    assert_eq!(store.get("players"), Value::Null);
}

#[tokio::test]
async fn test_invalid_path_is_reported() {
    let (_store, _auth, url) = start_server().await;
    let remote = RemoteStore::connect(&url).await.unwrap();

    let err = remote
        .update("", fields(json!({ "x": 1 })))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Rpc { code: -32602, .. }), "{err:?}");
}

#[tokio::test]
async fn test_subscription_receives_snapshots() {
    let (store, _auth, url) = start_server().await;
    store.set("coins/16x32", json!({ "x": 16, "y": 32 })).unwrap();

    let remote = RemoteStore::connect(&url).await.unwrap();
    let mut coins = remote.subscribe("coins").await.unwrap();

    let initial = timeout(WAIT, coins.next()).await.unwrap();
    assert_eq!(initial, Some(json!({ "16x32": { "x": 16, "y": 32 } })));

    store.remove("coins/16x32").unwrap();
    let after_remove = timeout(WAIT, coins.next()).await.unwrap();
    assert_eq!(after_remove, Some(Value::Null));

    assert!(remote.unsubscribe(coins.id()).await.unwrap());
    assert!(eventually(|| store.subscription_count() == 0).await);
}

#[tokio::test]
async fn test_remove_on_disconnect() {
    let (store, _auth, url) = start_server().await;
    let remote = RemoteStore::connect(&url).await.unwrap();
    let identity = remote.sign_in_anonymously().await.unwrap();
    let path = format!("players/{}", identity.uid);

    remote.set(&path, json!({ "x": 1, "y": 2 })).await.unwrap();
    remote.remove_on_disconnect(&path).await.unwrap();
    assert_eq!(store.get(&path), json!({ "x": 1, "y": 2 }));

    remote.close();
    drop(remote);

    assert!(eventually(|| store.get(&path).is_null()).await);
}
