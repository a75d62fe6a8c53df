//! HTTP transport.
//!
//! JSON-RPC rides over POST /mcp; protocol errors always come back as
//! HTTP 200 with a JSON-RPC error envelope. The side routes (/health,
//! /metrics) are plain JSON for operators, outside the protocol.

use crate::error::McpError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the router over a shared server instance.
pub fn create_router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_rpc).get(handle_server_info))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn handle_rpc(
    State(server): State<Arc<McpServer>>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    Json(server.handle_request(request).await)
}

/// GET /mcp identifies the server for clients probing the endpoint.
async fn handle_server_info(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    let identity = server.identity();
    Json(json!({
        "name": identity.name.clone(),
        "version": identity.version.clone(),
        "protocol": "jsonrpc-2.0",
        "endpoint": "/mcp",
        "status": "ok",
    }))
}

async fn handle_health(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    let identity = server.identity();
    Json(json!({
        "status": "ok",
        "service": identity.name.clone(),
        "version": identity.version.clone(),
    }))
}

/// Per-tool rolling statistics as a JSON object keyed by tool name.
async fn handle_metrics(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    Json(server.metrics().all_statistics())
}

/// Owns the listener and serves the router until the process exits.
pub struct HttpServer {
    host: String,
    port: u16,
    server: Arc<McpServer>,
}

impl HttpServer {
    pub fn new(host: impl Into<String>, port: u16, server: Arc<McpServer>) -> Self {
        Self {
            host: host.into(),
            port,
            server,
        }
    }

    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.server);
        let addr = format!("{}:{}", self.host, self.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| McpError::StartupFailed(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "HTTP server listening");

        axum::serve(listener, app).await?;
        Ok(())
    }
}
