//! Remote store client
//!
//! `SharedStore` over the `StoreServer` WebSocket protocol. One reader task
//! routes responses to pending calls and notifications to subscriptions;
//! one writer task owns the socket sink.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, Stream, StreamExt};
use serde_json::{json, Map, Value};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use crate::{
    auth::Identity,
    error::StoreError,
    path,
    store::SharedStore,
    subscriptions::{Subscription, SubscriptionId, CHANNEL_CAPACITY},
    ws_server::NOTIFICATION_METHOD,
};

/// In-flight request
struct PendingCall {
    reply: oneshot::Sender<Result<Value, StoreError>>,
    /// Route to install when a `subscribe` response arrives
    subscription: Option<broadcast::Sender<Value>>,
}

type PendingCalls = Arc<DashMap<u64, PendingCall>>;
type Routes = Arc<DashMap<SubscriptionId, broadcast::Sender<Value>>>;

/// WebSocket store client
pub struct RemoteStore {
    outbound: mpsc::UnboundedSender<Message>,
    pending: PendingCalls,
    routes: Routes,
    next_id: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

impl RemoteStore {
    /// Connect to a store server (`ws://host:port`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (ws_stream, _) = connect_async(url).await?;
        let (mut ws_sender, ws_receiver) = ws_stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if ws_sender.send(message).await.is_err() {
                    break;
                }
            }
        });

        let pending: PendingCalls = Arc::new(DashMap::new());
        let routes: Routes = Arc::new(DashMap::new());
        let reader = tokio::spawn(read_loop(ws_receiver, pending.clone(), routes.clone()));

        tracing::info!("Connected to store at {}", url);

        Ok(Self {
            outbound,
            pending,
            routes,
            next_id: AtomicU64::new(1),
            tasks: vec![writer, reader],
        })
    }

    /// Create an anonymous user on the server
    pub async fn sign_in_anonymously(&self) -> Result<Identity, StoreError> {
        let result = self.call("signInAnonymously", json!([]), None).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Close the socket; the server runs this connection's disconnect hooks
    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        subscription: Option<broadcast::Sender<Value>>,
    ) -> Result<Value, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (reply, response) = oneshot::channel();
        self.pending.insert(
            id,
            PendingCall {
                reply,
                subscription,
            },
        );

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if self
            .outbound
            .send(Message::Text(request.to_string()))
            .is_err()
        {
            self.pending.remove(&id);
            return Err(StoreError::ConnectionClosed);
        }

        response.await.map_err(|_| StoreError::ConnectionClosed)?
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn read_loop<S>(mut ws_receiver: S, pending: PendingCalls, routes: Routes)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Store connection error: {}", e);
                break;
            }
        };

        let message: Value = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Ignoring malformed store message: {}", e);
                continue;
            }
        };

        if message.get("method").and_then(Value::as_str) == Some(NOTIFICATION_METHOD) {
            route_notification(&routes, &message["params"]);
        } else if let Some(id) = message.get("id").and_then(Value::as_u64) {
            if let Some((_, call)) = pending.remove(&id) {
                complete_call(call, &message, &routes);
            }
        }
    }

    // Fail in-flight calls and end every subscription stream
    pending.clear();
    routes.clear();
    tracing::info!("Store connection closed");
}

fn complete_call(call: PendingCall, message: &Value, routes: &Routes) {
    let result = match message.get("error") {
        Some(error) => Err(StoreError::Rpc {
            code: error["code"].as_i64().unwrap_or(-32603),
            message: error["message"].as_str().unwrap_or_default().to_string(),
        }),
        None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
    };

    // Install the route before reading the next message so no notification
    // for this subscription can slip past
    if let (Ok(result), Some(sender)) = (&result, call.subscription) {
        if let Some(id) = result.get("subscription").and_then(Value::as_u64) {
            routes.insert(id, sender);
        }
    }

    let _ = call.reply.send(result);
}

fn route_notification(routes: &Routes, params: &Value) {
    let Some(id) = params.get("subscription").and_then(Value::as_u64) else {
        return;
    };
    let value = params.get("value").cloned().unwrap_or(Value::Null);

    let closed = match routes.get(&id) {
        Some(sender) => sender.send(value).is_err(),
        None => false,
    };
    if closed {
        routes.remove(&id);
    }
}

#[async_trait]
impl SharedStore for RemoteStore {
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let path = path::normalize(path);
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let result = self
            .call("subscribe", json!([path]), Some(sender))
            .await?;

        let id = result
            .get("subscription")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::UnexpectedResponse(result.to_string()))?;
        let initial = result.get("value").cloned().unwrap_or(Value::Null);

        Ok(Subscription::new(id, path, initial, receiver))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, StoreError> {
        self.routes.remove(&id);
        let result = self.call("unsubscribe", json!([id]), None).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        self.call("get", json!([path]), None).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.call("set", json!([path, value]), None).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.call("update", json!([path, fields]), None).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.call("remove", json!([path]), None).await?;
        Ok(())
    }

    async fn remove_on_disconnect(&self, path: &str) -> Result<(), StoreError> {
        self.call("onDisconnectRemove", json!([path]), None).await?;
        Ok(())
    }
}
