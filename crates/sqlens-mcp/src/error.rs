//! Server-level errors.

use thiserror::Error;

/// Failures of the server surface itself, not of individual tool calls.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Server startup failed: {0}")]
    StartupFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
