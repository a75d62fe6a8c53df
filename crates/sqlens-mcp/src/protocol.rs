//! JSON-RPC 2.0 message types.
//!
//! The envelope carried over every transport. Error codes follow the
//! JSON-RPC reserved range, plus one server-defined code for rejected
//! queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `jsonrpc` field is not exactly "2.0".
pub const INVALID_REQUEST: i32 = -32600;
/// Unknown method, unknown tool, or invalid tool arguments.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// The data source or the server itself failed.
pub const INTERNAL_ERROR: i32 = -32603;
/// The query was rejected by the SELECT-only or forbidden-keyword gate.
pub const SECURITY_VIOLATION: i32 = -32001;

/// JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response echoing the request id.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response echoing the request id.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}
