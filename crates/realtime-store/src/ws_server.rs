//! WebSocket Server
//!
//! JSON-RPC over WebSocket in front of a `MemoryStore`. Each socket gets its
//! own `StoreConnection`, so `onDisconnectRemove` paths are cleared when the
//! socket closes.
//!
//! Methods (positional params):
//! - `signInAnonymously []` -> `{uid, token}`
//! - `get [path]` -> value
//! - `subscribe [path]` -> `{subscription, value}`
//! - `unsubscribe [id]` -> bool
//! - `set [path, value]`, `update [path, fields]`, `remove [path]`,
//!   `onDisconnectRemove [path]` -> null
//!
//! Notifications: `storeNotification {subscription, value}`

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::{
    auth::AuthRegistry,
    error::StoreError,
    store::{MemoryStore, SharedStore, StoreConnection},
    subscriptions::{Subscription, SubscriptionId},
};

/// Notification method name
pub const NOTIFICATION_METHOD: &str = "storeNotification";

/// WebSocket JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct WsJsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// WebSocket Server
pub struct StoreServer {
    store: MemoryStore,
    auth: AuthRegistry,
}

impl StoreServer {
    /// Create a new WebSocket server
    pub fn new(store: MemoryStore, auth: AuthRegistry) -> Self {
        Self { store, auth }
    }

    /// Bind and run the WebSocket server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Store WebSocket server listening on {}", addr);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        while let Ok((stream, peer_addr)) = listener.accept().await {
            let store = self.store.clone();
            let auth = self.auth.clone();

            tokio::spawn(async move {
                tracing::debug!("Store client connected: {}", peer_addr);
                if let Err(e) = handle_connection(stream, store, auth).await {
                    tracing::warn!("WebSocket connection error from {}: {}", peer_addr, e);
                }
                tracing::debug!("Store client disconnected: {}", peer_addr);
            });
        }

        Ok(())
    }
}

/// Per-socket state
struct ConnectionState {
    connection: StoreConnection,
    /// Tasks forwarding snapshots to the socket, by subscription
    forwarders: HashMap<SubscriptionId, JoinHandle<()>>,
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    store: MemoryStore,
    auth: AuthRegistry,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Single writer: responses and notifications share one queue
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if ws_sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut state = ConnectionState {
        connection: store.connect(),
        forwarders: HashMap::new(),
    };

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket read error: {}", e);
                break;
            }
        };

        let request: WsJsonRpcRequest = match serde_json::from_str(&text) {
            Ok(req) => req,
            Err(_) => {
                let response = error_response(&Value::Null, -32700, "Parse error");
                if outbound.send(Message::Text(response.to_string())).is_err() {
                    break;
                }
                continue;
            }
        };

        let (response, subscription) = handle_ws_method(&auth, &mut state, &request).await;
        if outbound.send(Message::Text(response.to_string())).is_err() {
            break;
        }

        // Forward only after the response is queued, so the client learns
        // the subscription id before its first notification
        if let Some(subscription) = subscription {
            let id = subscription.id();
            let handle = spawn_forwarder(subscription, outbound.clone());
            state.forwarders.insert(id, handle);
        }
    }

    // Clean up on disconnect
    for (_, forwarder) in state.forwarders.drain() {
        forwarder.abort();
    }
    state.connection.disconnect();
    drop(outbound);
    let _ = writer.await;

    Ok(())
}

fn spawn_forwarder(
    mut subscription: Subscription,
    outbound: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = subscription.id();
        while let Some(value) = subscription.next().await {
            let notification = format_notification(id, value);
            if outbound
                .send(Message::Text(notification.to_string()))
                .is_err()
            {
                break;
            }
        }
    })
}

/// Handle WebSocket JSON-RPC method
async fn handle_ws_method(
    auth: &AuthRegistry,
    state: &mut ConnectionState,
    request: &WsJsonRpcRequest,
) -> (Value, Option<Subscription>) {
    let id = &request.id;
    let params: Vec<Value> = match &request.params {
        Value::Array(params) => params.clone(),
        Value::Null => Vec::new(),
        _ => return (error_response(id, -32602, "Params must be an array"), None),
    };
    let connection = &state.connection;

    match request.method.as_str() {
        "signInAnonymously" => {
            respond(id, Ok::<_, StoreError>(auth.sign_in_anonymously()))
        }

        "get" => match path_param(&params) {
            Ok(path) => respond(id, connection.get(path).await),
            Err(e) => (error_response(id, -32602, &e), None),
        },

        "subscribe" => match path_param(&params) {
            Ok(path) => match connection.subscribe(path).await {
                Ok(mut subscription) => {
                    let initial = subscription.take_initial().unwrap_or(Value::Null);
                    let result = json!({
                        "subscription": subscription.id(),
                        "value": initial,
                    });
                    (success_response(id, result), Some(subscription))
                }
                Err(e) => (store_error_response(id, &e), None),
            },
            Err(e) => (error_response(id, -32602, &e), None),
        },

        "unsubscribe" => match params.first().and_then(|v| v.as_u64()) {
            Some(sub_id) => {
                if let Some(forwarder) = state.forwarders.remove(&sub_id) {
                    forwarder.abort();
                }
                respond(id, connection.unsubscribe(sub_id).await)
            }
            None => (error_response(id, -32602, "Missing subscription ID"), None),
        },

        "set" => match (path_param(&params), params.get(1)) {
            (Ok(path), Some(value)) => respond(id, connection.set(path, value.clone()).await),
            (Err(e), _) => (error_response(id, -32602, &e), None),
            (_, None) => (error_response(id, -32602, "Missing value"), None),
        },

        "update" => match (path_param(&params), params.get(1)) {
            (Ok(path), Some(Value::Object(fields))) => {
                respond(id, connection.update(path, fields.clone()).await)
            }
            (Err(e), _) => (error_response(id, -32602, &e), None),
            (_, _) => (error_response(id, -32602, "Fields must be an object"), None),
        },

        "remove" => match path_param(&params) {
            Ok(path) => respond(id, connection.remove(path).await),
            Err(e) => (error_response(id, -32602, &e), None),
        },

        "onDisconnectRemove" => match path_param(&params) {
            Ok(path) => respond(id, connection.remove_on_disconnect(path).await),
            Err(e) => (error_response(id, -32602, &e), None),
        },

        _ => (
            error_response(id, -32601, &format!("Method not found: {}", request.method)),
            None,
        ),
    }
}

fn path_param(params: &[Value]) -> Result<&str, String> {
    params
        .first()
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing path parameter".to_string())
}

fn respond<T: serde::Serialize>(
    id: &Value,
    result: Result<T, StoreError>,
) -> (Value, Option<Subscription>) {
    let response = match result.map(serde_json::to_value) {
        Ok(Ok(value)) => success_response(id, value),
        Ok(Err(e)) => error_response(id, -32603, &e.to_string()),
        Err(e) => store_error_response(id, &e),
    };
    (response, None)
}

fn success_response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn store_error_response(id: &Value, error: &StoreError) -> Value {
    error_response(id, error.code(), &error.to_string())
}

/// Create error response
fn error_response(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Format a snapshot notification for WebSocket
pub fn format_notification(subscription: SubscriptionId, value: Value) -> Value {
    let mut params = Map::new();
    params.insert("subscription".into(), json!(subscription));
    params.insert("value".into(), value);
    json!({
        "jsonrpc": "2.0",
        "method": NOTIFICATION_METHOD,
        "params": params
    })
}
