//! HTTP JSON-RPC Server
//!
//! Serves `claimTreasure` on `POST /`. The caller is identified by the
//! `Authorization: Bearer <token>` header issued at anonymous sign-in.

use crate::{
    claim::{ClaimService, CLAIM_METHOD},
    error::ClaimError,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Reward HTTP server
pub struct RewardServer {
    service: Arc<ClaimService>,
}

impl RewardServer {
    pub fn new(service: Arc<ClaimService>) -> Self {
        Self { service }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // CORS layer to allow browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

        Router::new()
            .route("/", post(handle_rpc))
            .layer(cors)
            .with_state(self.service)
    }

    /// Bind `addr` and serve
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("Reward server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Handle JSON-RPC request
async fn handle_rpc(
    State(service): State<Arc<ClaimService>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    tracing::info!("RPC method called: {}", request.method);

    let result = match request.method.as_str() {
        CLAIM_METHOD => service
            .claim_treasure(bearer_token(&headers))
            .await
            .map(|result| json!(result)),
        other => Err(ClaimError::MethodNotFound(other.to_string())),
    };

    let response = match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(e) => {
            if e.code() == -32603 {
                tracing::error!("{} failed: {}", request.method, e);
            } else {
                tracing::warn!("{} rejected: {}", request.method, e);
            }
            JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: e.code(),
                    message: e.to_string(),
                }),
            }
        }
    };

    (StatusCode::OK, Json(response))
}
