//! JSON-RPC dispatcher.
//!
//! Routes the four protocol methods, classifies tool failures into the
//! JSON-RPC error codes, and records per-tool telemetry for every
//! successful call. Every outcome, success or failure, leaves as a
//! well-formed JSON-RPC response.

use crate::protocol::{
    CallToolParams, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_REQUEST,
    METHOD_NOT_FOUND, SECURITY_VIOLATION,
};
use crate::telemetry::{estimate_tokens, CallRecord, MetricsRegistry, ResponseMetadata};
use crate::tools::{ToolCall, ToolRegistry};
use serde_json::{json, Value};
use sqlens_core::config::ServerIdentity;
use sqlens_core::error::ToolError;
use std::sync::Arc;
use std::time::Instant;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// The protocol server: one instance per process, shared by all requests.
pub struct McpServer {
    identity: ServerIdentity,
    registry: ToolRegistry,
    metrics: Arc<MetricsRegistry>,
    max_query_rows: u32,
}

impl McpServer {
    pub fn new(
        identity: ServerIdentity,
        registry: ToolRegistry,
        metrics: Arc<MetricsRegistry>,
        max_query_rows: u32,
    ) -> Self {
        Self {
            identity,
            registry,
            metrics,
            max_query_rows,
        }
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Handle one JSON-RPC request, echoing its id into the response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid JSON-RPC version");
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "ping" => self.handle_ping(id),
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": self.identity.name.clone(),
                "version": self.identity.version.clone(),
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .registry
            .definitions()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    fn handle_ping(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "status": "ok",
                "server": self.identity.name.clone(),
            }),
        )
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => {
                return JsonRpcResponse::error(id, METHOD_NOT_FOUND, "Tool name is required")
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Invalid tool call parameters: {e}"),
                )
            }
        };

        let call = match ToolCall::parse(&params.name, &params.arguments) {
            Ok(call) => call,
            Err(e) => return self.tool_error_response(id, e),
        };
        let tool_name = call.tool_name();

        tracing::info!(tool = tool_name, "executing tool call");
        let started = Instant::now();

        let outcome = match self.registry.execute(call).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(tool = tool_name, error = %e, "tool call failed");
                return self.tool_error_response(id, e);
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let rendered = serde_json::to_string_pretty(&outcome.result.to_value())
            .unwrap_or_else(|_| "{}".to_string());
        let meta = ResponseMetadata::build(
            &rendered,
            &outcome.result,
            elapsed_ms,
            outcome.cached,
            self.max_query_rows,
        );

        self.metrics.record(
            tool_name,
            CallRecord {
                execution_time_ms: elapsed_ms,
                characters: rendered.chars().count() as u64,
                tokens: estimate_tokens(&rendered),
                cost_usd: meta.cost.estimated_cost_usd,
                cache_hit: outcome.cached,
            },
        );

        let result = json!({
            "content": [{
                "type": "text",
                "text": rendered,
            }],
            "isError": false,
            "meta": meta,
        });
        JsonRpcResponse::success(id, result)
    }

    fn tool_error_response(&self, id: Option<Value>, error: ToolError) -> JsonRpcResponse {
        match error {
            ToolError::Validation(msg) => JsonRpcResponse::error(id, METHOD_NOT_FOUND, msg),
            ToolError::Security(msg) => JsonRpcResponse::error(
                id,
                SECURITY_VIOLATION,
                format!("Security violation: {msg}"),
            ),
            ToolError::Execution(msg) => JsonRpcResponse::error(
                id,
                INTERNAL_ERROR,
                format!("Internal server error: {msg}"),
            ),
        }
    }
}
