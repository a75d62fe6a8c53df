//! Error taxonomy shared across the workspace.
//!
//! Every failure a tool can produce collapses into one of three kinds. The
//! dispatcher relies on the kind to pick a JSON-RPC error code, so downstream
//! code must preserve it: a rejected query is a security violation, not an
//! internal error.

use thiserror::Error;

/// Errors raised while validating or executing a tool call.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Malformed tool invocation: unknown tool name, missing or blank
    /// required argument, wrong argument type. Not retriable without
    /// correcting the arguments.
    #[error("{0}")]
    Validation(String),

    /// The query failed the SELECT-only or forbidden-keyword gate.
    /// Surfaced distinctly so callers can tell "rejected for safety"
    /// apart from "malformed".
    #[error("{0}")]
    Security(String),

    /// The data source failed to run a statement or a catalog call failed.
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Wrap a downstream failure as a generic execution error, keeping
    /// validation and security kinds intact so the dispatcher can still
    /// classify them.
    pub fn wrap_execution(self) -> Self {
        match self {
            Self::Validation(_) | Self::Security(_) => self,
            Self::Execution(msg) => Self::Execution(format!("Tool execution failed: {msg}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_preserves_validation_and_security() {
        let v = ToolError::validation("tableName parameter is required").wrap_execution();
        assert!(matches!(v, ToolError::Validation(_)));

        let s = ToolError::security("Only SELECT queries are allowed").wrap_execution();
        assert!(matches!(s, ToolError::Security(_)));
    }

    #[test]
    fn wrap_prefixes_execution() {
        let e = ToolError::execution("connection refused").wrap_execution();
        assert_eq!(
            e.to_string(),
            "Tool execution failed: connection refused"
        );
    }
}
