//! JSON-RPC tool-calling surface for database introspection.
//!
//! Exposes four tools to an LLM agent over a JSON-RPC 2.0 envelope:
//! schema overview, table detail, trigger listing and a SELECT-only
//! query tool. Every `tools/call` response carries token, cost and
//! latency metadata so the caller can budget its context window.

pub mod error;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod telemetry;
pub mod tools;

pub use error::McpError;
pub use http_transport::HttpServer;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::McpServer;
pub use telemetry::{estimate_tokens, MetricsRegistry, ResponseMetadata};
pub use tools::{ToolCall, ToolRegistry};
