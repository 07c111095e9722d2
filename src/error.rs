//! Error types for the MCP engine.

use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine.
///
/// Every variant maps onto exactly one JSON-RPC error code, see [`Error::code`].
#[derive(Error, Debug)]
pub enum Error {
    // ===== Envelope Errors =====
    #[error("Invalid JSON")]
    Parse,

    #[error("Invalid initialize params: {0}")]
    InvalidInitialize(String),

    #[error("Invalid Request")]
    InvalidRequest,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    // ===== Precondition Errors =====
    #[error("Server not initialized")]
    NotInitialized,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Missing required argument: {0}")]
    MissingPromptArgument(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    // ===== Handler Errors =====
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP server error: {0}")]
    HttpServer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Create a handler failure from any displayable message.
    ///
    /// Third-party handlers use this to report a failed execution; the
    /// dispatcher surfaces it as `-32603`.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Self::HandlerFailed(message.to_string())
    }

    /// The JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse | Self::InvalidInitialize(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::NotInitialized => error_codes::NOT_INITIALIZED,
            Self::InvalidParams(_)
            | Self::ToolNotFound(_)
            | Self::PromptNotFound(_)
            | Self::MissingPromptArgument(_) => error_codes::INVALID_PARAMS,
            Self::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            Self::HandlerFailed(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::HttpServer(_)
            | Self::Config(_)
            | Self::Transport(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Optional `error.data` payload.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::ResourceNotFound(uri) => Some(json!({ "uri": uri })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Parse.to_string(), "Invalid JSON");
        assert_eq!(Error::InvalidRequest.to_string(), "Invalid Request");
        assert_eq!(
            Error::MissingPromptArgument("code".to_string()).to_string(),
            "Missing required argument: code"
        );
        assert_eq!(
            Error::handler("division by zero").to_string(),
            "Handler failed: division by zero"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Parse.code(), -32700);
        assert_eq!(Error::InvalidInitialize("x".into()).code(), -32700);
        assert_eq!(Error::InvalidRequest.code(), -32600);
        assert_eq!(Error::MethodNotFound("foo".into()).code(), -32601);
        assert_eq!(Error::ToolNotFound("t".into()).code(), -32602);
        assert_eq!(Error::PromptNotFound("p".into()).code(), -32602);
        assert_eq!(Error::MissingPromptArgument("a".into()).code(), -32602);
        assert_eq!(Error::handler("boom").code(), -32603);
        assert_eq!(Error::NotInitialized.code(), -32001);
        assert_eq!(Error::ResourceNotFound("cfg://x".into()).code(), -32002);
        assert_eq!(Error::Transport("closed".into()).code(), -32603);
    }

    #[test]
    fn test_resource_not_found_carries_uri() {
        let err = Error::ResourceNotFound("cfg://x".to_string());
        assert_eq!(err.data(), Some(json!({ "uri": "cfg://x" })));
        assert!(Error::ToolNotFound("x".into()).data().is_none());
    }

    #[test]
    fn test_io_errors_are_internal() {
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.code(), -32603);
        assert!(io.to_string().contains("disk"));
    }
}
